//! Capability traits for the external auth/transport collaborator.
//!
//! The real messaging protocol lives entirely behind these two traits; the
//! engine depends only on their success/failure contract. Production speaks
//! to a bridge sidecar over HTTP (`drumbeat-transport`); tests substitute
//! scripted fakes.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{CredentialMaterial, DeviceProfile};

/// Exchanges stored credentials for a live session.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Authenticate one account. Failures map to [`DrumbeatError::Auth`].
    ///
    /// [`DrumbeatError::Auth`]: crate::error::DrumbeatError::Auth
    async fn authenticate(
        &self,
        credentials: &CredentialMaterial,
        profile: &DeviceProfile,
    ) -> Result<Box<dyn MessengerSession>>;
}

/// A live authenticated session for exactly one account.
#[async_trait]
pub trait MessengerSession: Send + Sync {
    /// Account identity as assigned by the upstream service at login.
    fn account_id(&self) -> &str;

    /// Device fingerprint as (possibly) rotated by this login. Callers
    /// persist it so the next login presents the same device.
    fn refreshed_profile(&self) -> DeviceProfile;

    /// Deliver one message to one conversation. Failures map to
    /// [`DrumbeatError::Send`] and end the account's loop.
    ///
    /// [`DrumbeatError::Send`]: crate::error::DrumbeatError::Send
    async fn send(&self, target_id: &str, message: &str) -> Result<()>;
}
