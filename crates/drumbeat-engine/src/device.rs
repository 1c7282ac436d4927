//! Device profile store — one JSON fingerprint reused by every login.

use std::path::{Path, PathBuf};

use drumbeat_core::types::DeviceProfile;

/// File-backed singleton device profile.
pub struct DeviceProfileStore {
    path: PathBuf,
}

impl DeviceProfileStore {
    /// Create a store at the given file path (parent dirs are created).
    pub fn new(path: &Path) -> Self {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        Self {
            path: path.to_path_buf(),
        }
    }

    /// The stored profile, or defaults when the file is missing, unreadable,
    /// or unparsable. Fields absent from the file are filled by serde.
    pub fn load(&self) -> DeviceProfile {
        if !self.path.exists() {
            return DeviceProfile::default();
        }
        match std::fs::read_to_string(&self.path) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                tracing::warn!("⚠️ Failed to parse {}: {e}", self.path.display());
                DeviceProfile::default()
            }),
            Err(e) => {
                tracing::warn!("⚠️ Failed to read {}: {e}", self.path.display());
                DeviceProfile::default()
            }
        }
    }

    /// Best-effort atomic overwrite; last writer wins. Failures are logged
    /// and swallowed.
    pub fn save(&self, profile: &DeviceProfile) {
        let json = match serde_json::to_string_pretty(profile) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("⚠️ Failed to serialize device profile: {e}");
                return;
            }
        };
        let tmp = self.path.with_extension("json.tmp");
        let result = std::fs::write(&tmp, &json).and_then(|_| std::fs::rename(&tmp, &self.path));
        match result {
            Ok(()) => tracing::debug!("💾 Device profile saved (client_id={})", profile.client_id),
            Err(e) => tracing::warn!("⚠️ Failed to save device profile: {e}"),
        }
    }
}
