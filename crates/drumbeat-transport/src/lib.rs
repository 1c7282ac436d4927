//! Transport layer: the production messenger implementation, which drives a
//! protocol bridge sidecar over a small JSON API.

pub mod bridge;

pub use bridge::BridgeMessenger;
