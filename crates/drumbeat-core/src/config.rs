//! Drumbeat configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DrumbeatConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub bridge: BridgeConfig,
}

impl DrumbeatConfig {
    /// Load config from `DRUMBEAT_CONFIG` or the default path
    /// (~/.drumbeat/config.toml). Missing file means defaults.
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var("DRUMBEAT_CONFIG") {
            return Self::load_from(Path::new(&path));
        }
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::DrumbeatError::Config(format!("Failed to read config: {e}"))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            crate::error::DrumbeatError::Config(format!("Failed to parse config: {e}"))
        })?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| {
            crate::error::DrumbeatError::Config(format!("Failed to serialize config: {e}"))
        })?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".drumbeat")
            .join("config.toml")
    }

    /// Get the Drumbeat home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".drumbeat")
    }
}

/// Gateway (HTTP surface) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 { 2007 }
fn default_host() -> String { "0.0.0.0".into() }

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

/// Where the durable state files live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory. May contain `~`; the binary expands it before the
    /// engine ever sees it.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_ledger_file")]
    pub ledger_file: String,
    #[serde(default = "default_device_file")]
    pub device_file: String,
}

fn default_data_dir() -> String { "~/.drumbeat".into() }
fn default_ledger_file() -> String { "recovery.json".into() }
fn default_device_file() -> String { "device.json".into() }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            ledger_file: default_ledger_file(),
            device_file: default_device_file(),
        }
    }
}

impl StorageConfig {
    pub fn ledger_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.ledger_file)
    }

    pub fn device_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join(&self.device_file)
    }
}

/// Transport bridge sidecar configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_bridge_url")]
    pub base_url: String,
    #[serde(default = "default_bridge_timeout")]
    pub timeout_secs: u64,
}

fn default_bridge_url() -> String { "http://127.0.0.1:8080".into() }
fn default_bridge_timeout() -> u64 { 30 }

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: default_bridge_url(),
            timeout_secs: default_bridge_timeout(),
        }
    }
}
