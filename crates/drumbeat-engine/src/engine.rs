//! Engine facade: owns the registry, ledger, device store, and collaborator,
//! and exposes the task lifecycle operations the gateway calls.

use std::sync::Arc;

use serde::Deserialize;
use tokio::task::JoinHandle;

use drumbeat_core::config::StorageConfig;
use drumbeat_core::error::{DrumbeatError, Result};
use drumbeat_core::traits::{Messenger, MessengerSession};
use drumbeat_core::types::{SessionRecord, parse_credential_string};

use crate::device::DeviceProfileStore;
use crate::dispatch::{self, LoopExit, LoopState};
use crate::ledger::SessionLedger;
use crate::registry::TaskRegistry;

/// A new-task submission, exactly as the gateway receives it.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitRequest {
    /// Delimited credential string: `k1=v1; k2=v2; ...`.
    pub credentials: String,
    /// Seconds between sends.
    pub cadence_secs: u64,
    /// Prepended to every outgoing message.
    pub message_prefix: String,
    /// Conversation to post into.
    pub target_id: String,
    /// Rotating message sequence; blank lines are dropped.
    pub messages: Vec<String>,
}

/// One engine per process; the gateway and the resume orchestrator share it
/// behind an `Arc`.
pub struct SessionEngine {
    registry: TaskRegistry,
    ledger: SessionLedger,
    devices: DeviceProfileStore,
    messenger: Arc<dyn Messenger>,
}

impl SessionEngine {
    pub fn new(storage: &StorageConfig, messenger: Arc<dyn Messenger>) -> Self {
        Self {
            registry: TaskRegistry::new(),
            ledger: SessionLedger::new(&storage.ledger_path()),
            devices: DeviceProfileStore::new(&storage.device_path()),
            messenger,
        }
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &SessionLedger {
        &self.ledger
    }

    pub fn devices(&self) -> &DeviceProfileStore {
        &self.devices
    }

    pub fn messenger(&self) -> &dyn Messenger {
        self.messenger.as_ref()
    }

    /// Validate a submission, log the account in once to learn its id, and
    /// start its dispatch loop.
    ///
    /// This first login only discovers the identity and refreshes the
    /// device fingerprint; the loop then performs its own login under the
    /// retry budget before the first send. Submitting an account that is
    /// already running still returns its id — the loop's idempotent entry
    /// keeps it single.
    pub async fn submit(self: &Arc<Self>, request: SubmitRequest) -> Result<String> {
        validate_request(&request)?;
        let credentials = parse_credential_string(&request.credentials);
        if credentials.is_empty() {
            return Err(DrumbeatError::Validation(
                "credentials contain no usable key=value pairs".into(),
            ));
        }
        let messages: Vec<String> = request
            .messages
            .into_iter()
            .map(|m| m.trim_end().to_string())
            .filter(|m| !m.is_empty())
            .collect();

        let profile = self.devices.load();
        let session = self.messenger.authenticate(&credentials, &profile).await?;
        self.devices.save(&session.refreshed_profile());
        let account_id = session.account_id().to_string();
        tracing::info!("✅ [{account_id}] submission authenticated");

        let record = SessionRecord {
            account_id: account_id.clone(),
            credentials,
            cadence_secs: request.cadence_secs,
            message_prefix: request.message_prefix,
            target_id: request.target_id,
            messages,
            cursor: 0,
            created_at: chrono::Utc::now(),
            last_send_at: None,
        };
        self.spawn_fresh(record);
        Ok(account_id)
    }

    /// Start the first-start path: the loop authenticates under the retry
    /// budget before its first send.
    pub fn spawn_fresh(self: &Arc<Self>, record: SessionRecord) -> JoinHandle<LoopExit> {
        let initial = LoopState::Authenticating {
            attempt: 1,
            start_cursor: record.start_cursor(),
        };
        self.spawn_loop(record, initial, None)
    }

    /// Start the resume path: authentication already happened, the loop
    /// picks up at the persisted cursor with the live session.
    pub fn spawn_resumed(
        self: &Arc<Self>,
        record: SessionRecord,
        session: Box<dyn MessengerSession>,
    ) -> JoinHandle<LoopExit> {
        let initial = LoopState::Sending {
            cursor: record.start_cursor(),
        };
        self.spawn_loop(record, initial, Some(session))
    }

    fn spawn_loop(
        self: &Arc<Self>,
        record: SessionRecord,
        initial: LoopState,
        session: Option<Box<dyn MessengerSession>>,
    ) -> JoinHandle<LoopExit> {
        tokio::spawn(dispatch::run(Arc::clone(self), record, initial, session))
    }

    /// Cancel an account's loop. Deregisters and prunes the ledger when the
    /// account was active; cancelling an unknown account changes nothing.
    pub async fn cancel(&self, account_id: &str) -> bool {
        if !self.registry.stop(account_id) {
            return false;
        }
        if let Err(e) = self.ledger.remove(account_id).await {
            tracing::warn!("⚠️ [{account_id}] failed to prune ledger record: {e}");
        }
        tracing::info!("🛑 [{account_id}] task stopped");
        true
    }

    pub fn is_active(&self, account_id: &str) -> bool {
        self.registry.is_active(account_id)
    }

    pub fn active_accounts(&self) -> Vec<String> {
        self.registry.active_accounts()
    }
}

fn validate_request(request: &SubmitRequest) -> Result<()> {
    if request.credentials.trim().is_empty() {
        return Err(DrumbeatError::Validation("credentials are required".into()));
    }
    if request.cadence_secs == 0 {
        return Err(DrumbeatError::Validation(
            "cadence_secs must be at least 1".into(),
        ));
    }
    if request.message_prefix.trim().is_empty() {
        return Err(DrumbeatError::Validation(
            "message_prefix is required".into(),
        ));
    }
    if request.target_id.trim().is_empty() {
        return Err(DrumbeatError::Validation("target_id is required".into()));
    }
    if !request.messages.iter().any(|m| !m.trim().is_empty()) {
        return Err(DrumbeatError::Validation(
            "messages must contain at least one non-empty line".into(),
        ));
    }
    Ok(())
}
