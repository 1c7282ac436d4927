//! Workspace-wide error type.

use thiserror::Error;

/// Convenience result alias used across all Drumbeat crates.
pub type Result<T> = std::result::Result<T, DrumbeatError>;

#[derive(Debug, Error)]
pub enum DrumbeatError {
    /// Malformed submission. Rejected synchronously; no task is created.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The collaborator refused or could not complete a login.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The collaborator could not deliver a message. Fatal for the task.
    #[error("send failed: {0}")]
    Send(String),

    /// Ledger or device-profile file trouble (read, write, or parse).
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Bad or unloadable configuration.
    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
