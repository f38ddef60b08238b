//! Chat orchestration.
//!
//! - `turn`: the per-student context and the interactive turn loop
//! - `summary`: the end-of-session evaluation/commentary batch
//! - `review`: session listing and titling over the student's log
//! - `processing`: the in-flight flag shared with the shell

mod processing;
mod review;
mod state;
mod summary;
mod turn;

pub use processing::{ProcessingFlag, ProcessingGuard};
pub use state::{ChatEvent, SessionSummary, TurnState};
pub use turn::{ChatOrchestrator, DEFAULT_HISTORY_LIMIT};
