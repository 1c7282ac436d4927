//! Data model: credential material, device profiles, session records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DrumbeatError, Result};

/// One cookie-style key/value pair of login material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    pub key: String,
    pub value: String,
}

/// Reauthenticatable credential material for one account: a flat list of
/// key/value pairs, stored verbatim in the session ledger.
pub type CredentialMaterial = Vec<CredentialPair>;

/// Parse a delimited credential string (`k1=v1; k2=v2; ...`) into pairs.
///
/// This is the single conversion between the submission form and the stored
/// form. The ledger persists the pairs themselves, so a record reloaded
/// after a crash authenticates with exactly the material a fresh submission
/// would have produced.
///
/// Segments without a `=` or with an empty key/value are skipped. Values
/// keep any `=` characters past the first one.
pub fn parse_credential_string(raw: &str) -> CredentialMaterial {
    raw.split(';')
        .filter_map(|segment| {
            let (key, value) = segment.split_once('=')?;
            let (key, value) = (key.trim(), value.trim());
            if key.is_empty() || value.is_empty() {
                return None;
            }
            Some(CredentialPair {
                key: key.to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}

fn default_client_id() -> String {
    "drumbeat-relay".into()
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64; rv:133.0) Gecko/20100101 Firefox/133.0".into()
}
fn default_context() -> serde_json::Value {
    serde_json::json!({})
}

/// Singleton device fingerprint shared by every account's logins.
///
/// Reusing one stable fingerprint across restarts keeps the upstream
/// service from treating each resume as a brand-new device. The
/// collaborator may rotate fields at login; the refreshed profile is
/// persisted after every successful authentication, last writer wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceProfile {
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// Some transports issue a second, transport-level client id.
    #[serde(default)]
    pub transport_client_id: Option<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Opaque collaborator state carried verbatim between logins.
    #[serde(default = "default_context")]
    pub context: serde_json::Value,
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            client_id: default_client_id(),
            transport_client_id: None,
            user_agent: default_user_agent(),
            context: default_context(),
        }
    }
}

/// Durable description of one account's send loop; the unit of crash
/// recovery. Everything a resume needs lives in this record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Identity assigned by the upstream service at first successful login.
    pub account_id: String,
    pub credentials: CredentialMaterial,
    /// Seconds between sends. Must be at least 1.
    pub cadence_secs: u64,
    /// Prepended (with a single space) to every outgoing message.
    pub message_prefix: String,
    /// The one conversation this account posts into.
    pub target_id: String,
    /// Rotating message sequence; never empty for a runnable record.
    pub messages: Vec<String>,
    /// Index of the next sequence element to send.
    #[serde(default)]
    pub cursor: usize,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_send_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    /// Reject records that can never run a send loop.
    pub fn validate(&self) -> Result<()> {
        if self.account_id.trim().is_empty() {
            return Err(DrumbeatError::Validation("account_id is empty".into()));
        }
        if self.target_id.trim().is_empty() {
            return Err(DrumbeatError::Validation("target_id is empty".into()));
        }
        if self.message_prefix.trim().is_empty() {
            return Err(DrumbeatError::Validation("message_prefix is empty".into()));
        }
        if self.cadence_secs == 0 {
            return Err(DrumbeatError::Validation(
                "cadence_secs must be at least 1".into(),
            ));
        }
        if self.messages.is_empty() {
            return Err(DrumbeatError::Validation("message sequence is empty".into()));
        }
        Ok(())
    }

    /// Persisted cursor clamped into the sequence. A hand-edited or stale
    /// ledger entry resumes from a valid position instead of panicking.
    pub fn start_cursor(&self) -> usize {
        if self.messages.is_empty() {
            0
        } else {
            self.cursor % self.messages.len()
        }
    }

    /// The outgoing text for a cursor position: prefix, one space, element.
    pub fn compose(&self, cursor: usize) -> String {
        format!(
            "{} {}",
            self.message_prefix,
            self.messages[cursor % self.messages.len()]
        )
    }
}
