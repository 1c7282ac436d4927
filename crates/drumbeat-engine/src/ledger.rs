//! Session ledger — the durable `{ "users": [...] }` record file.
//!
//! Every mutation is a whole-file read-modify-write; one async mutex
//! serializes those cycles so two loops persisting progress at the same
//! time cannot drop each other's updates. Writes land in a temp file and
//! are renamed over the target — the snapshot on disk is always a complete
//! document, never a partial write.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use drumbeat_core::error::{DrumbeatError, Result};
use drumbeat_core::types::SessionRecord;

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    #[serde(default)]
    users: Vec<SessionRecord>,
}

/// File-backed session ledger.
pub struct SessionLedger {
    path: PathBuf,
    gate: Mutex<()>,
}

impl SessionLedger {
    /// Create a ledger at the given file path (parent dirs are created).
    pub fn new(path: &Path) -> Self {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        Self {
            path: path.to_path_buf(),
            gate: Mutex::new(()),
        }
    }

    /// All records, in ledger order. A missing, unreadable, or malformed
    /// file yields an empty list — recovery starts from nothing rather
    /// than refusing to boot.
    pub async fn load_all(&self) -> Vec<SessionRecord> {
        let _guard = self.gate.lock().await;
        self.read_records()
    }

    /// Overwrite the whole document.
    pub async fn save_all(&self, records: &[SessionRecord]) -> Result<()> {
        let _guard = self.gate.lock().await;
        self.write_records(records)
    }

    /// Insert or shallow-merge one record.
    ///
    /// If a record with this id exists, fields present in `patch` replace
    /// the same-named fields and every other field is preserved. If none
    /// exists, `patch` must describe a complete record and is appended.
    /// Ids stay unique — merging never appends a second record.
    pub async fn upsert(&self, account_id: &str, patch: serde_json::Value) -> Result<()> {
        let _guard = self.gate.lock().await;
        let mut records = self.read_records();
        match records.iter_mut().find(|r| r.account_id == account_id) {
            Some(existing) => *existing = merge_record(existing, &patch)?,
            None => {
                let record: SessionRecord = serde_json::from_value(patch).map_err(|e| {
                    DrumbeatError::Persistence(format!(
                        "upsert of new record {account_id} needs a full record: {e}"
                    ))
                })?;
                records.push(record);
            }
        }
        self.write_records(&records)
    }

    /// Delete a record. Returns whether anything was removed.
    pub async fn remove(&self, account_id: &str) -> Result<bool> {
        let _guard = self.gate.lock().await;
        let mut records = self.read_records();
        let before = records.len();
        records.retain(|r| r.account_id != account_id);
        if records.len() == before {
            return Ok(false);
        }
        self.write_records(&records)?;
        Ok(true)
    }

    fn read_records(&self) -> Vec<SessionRecord> {
        if !self.path.exists() {
            return Vec::new();
        }
        match std::fs::read_to_string(&self.path) {
            Ok(json) => match serde_json::from_str::<LedgerFile>(&json) {
                Ok(file) => file.users,
                Err(e) => {
                    tracing::warn!("⚠️ Failed to parse {}: {e}", self.path.display());
                    Vec::new()
                }
            },
            Err(e) => {
                tracing::warn!("⚠️ Failed to read {}: {e}", self.path.display());
                Vec::new()
            }
        }
    }

    fn write_records(&self, records: &[SessionRecord]) -> Result<()> {
        let doc = LedgerFile {
            users: records.to_vec(),
        };
        let json = serde_json::to_string_pretty(&doc)
            .map_err(|e| DrumbeatError::Persistence(format!("Serialize error: {e}")))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)
            .map_err(|e| DrumbeatError::Persistence(format!("Write error: {e}")))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| DrumbeatError::Persistence(format!("Rename error: {e}")))?;
        tracing::debug!(
            "💾 Saved {} session record(s) to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// Shallow JSON merge: keys in `patch` overwrite, the rest survive.
fn merge_record(existing: &SessionRecord, patch: &serde_json::Value) -> Result<SessionRecord> {
    let mut merged = serde_json::to_value(existing)
        .map_err(|e| DrumbeatError::Persistence(format!("Serialize error: {e}")))?;
    if let (Some(fields), Some(patch_fields)) = (merged.as_object_mut(), patch.as_object()) {
        for (key, value) in patch_fields {
            fields.insert(key.clone(), value.clone());
        }
    }
    serde_json::from_value(merged)
        .map_err(|e| DrumbeatError::Persistence(format!("Merged record is invalid: {e}")))
}
