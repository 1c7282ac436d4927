//! Drumbeat engine: per-account dispatch loops, the durable session ledger,
//! the shared device profile, and startup crash recovery.

pub mod device;
pub mod dispatch;
pub mod engine;
pub mod ledger;
pub mod registry;
pub mod resume;

pub use device::DeviceProfileStore;
pub use dispatch::{
    AUTH_ATTEMPT_LIMIT, AUTH_RETRY_BACKOFF, LoopEvent, LoopExit, LoopState, Transition, next_state,
};
pub use engine::{SessionEngine, SubmitRequest};
pub use ledger::SessionLedger;
pub use registry::TaskRegistry;
pub use resume::{RESUME_STAGGER, resume_all};
