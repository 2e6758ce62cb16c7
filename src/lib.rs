// agritrial - field-trial record management with local snapshot persistence

pub mod catalog;
pub mod error;
pub mod export;
pub mod filter;
pub mod ident;
pub mod models;
pub mod session;
pub mod storage;
pub mod store;

// Re-export main types for convenience
pub use error::{Error, Result};
pub use filter::TrialFilter;
pub use models::{
    NewTreatment, NewTrial, Treatment, TreatmentKind, TreatmentPatch, Trial, TrialKind,
    TrialPatch, TrialStatus, now_ms,
};
pub use session::{PendingLogin, Session, SessionGate};
pub use storage::{Backend, FileBackend, MemoryBackend};
pub use store::Store;
