#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use drumbeat_core::config::StorageConfig;
use drumbeat_core::error::{DrumbeatError, Result};
use drumbeat_core::traits::{Messenger, MessengerSession};
use drumbeat_core::types::{
    CredentialMaterial, DeviceProfile, SessionRecord, parse_credential_string,
};
use drumbeat_engine::SessionEngine;

/// One delivered message, as observed by the fake collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub account_id: String,
    pub target_id: String,
    pub message: String,
}

/// One login attempt with its virtual-clock timestamp.
#[derive(Debug, Clone)]
pub struct LoginAttempt {
    pub account_id: String,
    pub at: tokio::time::Instant,
}

#[derive(Default)]
struct ScriptState {
    login_script: HashMap<String, VecDeque<bool>>,
    send_script: HashMap<String, VecDeque<bool>>,
    logins: Vec<LoginAttempt>,
    sends: Vec<SentMessage>,
}

/// Scriptable stand-in for the real collaborator. Outcomes are queued per
/// account; a missing or exhausted queue means success.
#[derive(Default)]
pub struct ScriptedMessenger {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedMessenger {
    pub fn script_logins(&self, account_id: &str, outcomes: &[bool]) {
        let mut state = self.state.lock().unwrap();
        state
            .login_script
            .insert(account_id.to_string(), outcomes.iter().copied().collect());
    }

    pub fn script_sends(&self, account_id: &str, outcomes: &[bool]) {
        let mut state = self.state.lock().unwrap();
        state
            .send_script
            .insert(account_id.to_string(), outcomes.iter().copied().collect());
    }

    pub fn login_attempts(&self) -> Vec<LoginAttempt> {
        self.state.lock().unwrap().logins.clone()
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.state.lock().unwrap().sends.clone()
    }
}

fn account_from(credentials: &CredentialMaterial) -> String {
    credentials
        .iter()
        .find(|p| p.key == "uid")
        .map(|p| p.value.clone())
        .unwrap_or_else(|| "unknown".to_string())
}

#[async_trait]
impl Messenger for ScriptedMessenger {
    async fn authenticate(
        &self,
        credentials: &CredentialMaterial,
        _profile: &DeviceProfile,
    ) -> Result<Box<dyn MessengerSession>> {
        let account_id = account_from(credentials);
        let ok = {
            let mut state = self.state.lock().unwrap();
            state.logins.push(LoginAttempt {
                account_id: account_id.clone(),
                at: tokio::time::Instant::now(),
            });
            state
                .login_script
                .get_mut(&account_id)
                .and_then(|q| q.pop_front())
                .unwrap_or(true)
        };
        if ok {
            Ok(Box::new(ScriptedSession {
                account_id,
                state: Arc::clone(&self.state),
            }))
        } else {
            Err(DrumbeatError::Auth("scripted login failure".into()))
        }
    }
}

struct ScriptedSession {
    account_id: String,
    state: Arc<Mutex<ScriptState>>,
}

#[async_trait]
impl MessengerSession for ScriptedSession {
    fn account_id(&self) -> &str {
        &self.account_id
    }

    fn refreshed_profile(&self) -> DeviceProfile {
        DeviceProfile {
            client_id: "scripted-device".to_string(),
            ..DeviceProfile::default()
        }
    }

    async fn send(&self, target_id: &str, message: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let ok = state
            .send_script
            .get_mut(&self.account_id)
            .and_then(|q| q.pop_front())
            .unwrap_or(true);
        if ok {
            state.sends.push(SentMessage {
                account_id: self.account_id.clone(),
                target_id: target_id.to_string(),
                message: message.to_string(),
            });
            Ok(())
        } else {
            Err(DrumbeatError::Send("scripted send failure".into()))
        }
    }
}

/// Engine wired to a scripted collaborator and a throwaway data directory.
pub struct TestBed {
    pub engine: Arc<SessionEngine>,
    pub messenger: Arc<ScriptedMessenger>,
    dir: PathBuf,
}

impl TestBed {
    pub fn new(tag: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("drumbeat-test-{tag}"));
        std::fs::remove_dir_all(&dir).ok();
        let storage = StorageConfig {
            data_dir: dir.to_string_lossy().into_owned(),
            ledger_file: "recovery.json".to_string(),
            device_file: "device.json".to_string(),
        };
        let messenger = Arc::new(ScriptedMessenger::default());
        let engine = Arc::new(SessionEngine::new(
            &storage,
            Arc::clone(&messenger) as Arc<dyn Messenger>,
        ));
        Self {
            engine,
            messenger,
            dir,
        }
    }
}

impl Drop for TestBed {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.dir).ok();
    }
}

pub fn creds_for(account_id: &str) -> String {
    format!("uid={account_id}; token=tok-{account_id}")
}

pub fn record(account_id: &str, messages: &[&str], cursor: usize) -> SessionRecord {
    SessionRecord {
        account_id: account_id.to_string(),
        credentials: parse_credential_string(&creds_for(account_id)),
        cadence_secs: 5,
        message_prefix: "Team".to_string(),
        target_id: "900100".to_string(),
        messages: messages.iter().map(|m| (*m).to_string()).collect(),
        cursor,
        created_at: chrono::Utc::now(),
        last_send_at: None,
    }
}

/// Poll a condition, nudging the paused clock forward in small steps.
pub async fn wait_until(cond: impl Fn() -> bool) {
    for _ in 0..400 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("condition not met within virtual time budget");
}
