//! Drumbeat core: the data model, error type, configuration, and the
//! collaborator traits every other crate builds on.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::DrumbeatConfig;
pub use error::{DrumbeatError, Result};
pub use traits::{Messenger, MessengerSession};
pub use types::{
    CredentialMaterial, CredentialPair, DeviceProfile, SessionRecord, parse_credential_string,
};
