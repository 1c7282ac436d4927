//! Bridge client — login and message delivery via a sidecar's JSON API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use drumbeat_core::config::BridgeConfig;
use drumbeat_core::error::{DrumbeatError, Result};
use drumbeat_core::traits::{Messenger, MessengerSession};
use drumbeat_core::types::{CredentialMaterial, DeviceProfile};

/// Messenger backed by a bridge sidecar that speaks the real protocol.
///
/// The engine never sees protocol details; the sidecar takes the credential
/// pairs and device fingerprint, performs the login, and reports the account
/// id plus any fingerprint fields the platform rotated.
pub struct BridgeMessenger {
    base_url: String,
    client: reqwest::Client,
}

impl BridgeMessenger {
    pub fn new(config: &BridgeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DrumbeatError::Config(format!("Failed to build bridge client: {e}")))?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl Messenger for BridgeMessenger {
    async fn authenticate(
        &self,
        credentials: &CredentialMaterial,
        profile: &DeviceProfile,
    ) -> Result<Box<dyn MessengerSession>> {
        let request = LoginRequest {
            credentials,
            device: profile,
        };
        let response = self
            .client
            .post(self.endpoint("/v1/login"))
            .json(&request)
            .send()
            .await
            .map_err(|e| DrumbeatError::Auth(format!("bridge login request failed: {e}")))?;
        let body: LoginResponse = response
            .json()
            .await
            .map_err(|e| DrumbeatError::Auth(format!("invalid bridge login response: {e}")))?;

        if !body.ok {
            return Err(DrumbeatError::Auth(
                body.error.unwrap_or_else(|| "bridge rejected login".into()),
            ));
        }
        let account_id = body.account_id.ok_or_else(|| {
            DrumbeatError::Auth("bridge login response missing account_id".into())
        })?;
        tracing::debug!("bridge login ok for account {account_id}");

        let refreshed = body.device.unwrap_or_else(|| profile.clone());
        Ok(Box::new(BridgeSession {
            account_id,
            refreshed,
            base_url: self.base_url.clone(),
            client: self.client.clone(),
        }))
    }
}

/// Live session minted by a successful bridge login.
struct BridgeSession {
    account_id: String,
    refreshed: DeviceProfile,
    base_url: String,
    client: reqwest::Client,
}

#[async_trait]
impl MessengerSession for BridgeSession {
    fn account_id(&self) -> &str {
        &self.account_id
    }

    fn refreshed_profile(&self) -> DeviceProfile {
        self.refreshed.clone()
    }

    async fn send(&self, target_id: &str, message: &str) -> Result<()> {
        let request = SendRequest {
            account_id: &self.account_id,
            target_id,
            message,
        };
        let response = self
            .client
            .post(format!("{}/v1/send", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| DrumbeatError::Send(format!("bridge send request failed: {e}")))?;
        let body: SendResponse = response
            .json()
            .await
            .map_err(|e| DrumbeatError::Send(format!("invalid bridge send response: {e}")))?;

        if !body.ok {
            return Err(DrumbeatError::Send(
                body.error.unwrap_or_else(|| "bridge rejected send".into()),
            ));
        }
        Ok(())
    }
}

// --- Bridge wire types ---

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    credentials: &'a CredentialMaterial,
    device: &'a DeviceProfile,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    ok: bool,
    #[serde(default)]
    account_id: Option<String>,
    #[serde(default)]
    device: Option<DeviceProfile>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    account_id: &'a str,
    target_id: &'a str,
    message: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}
