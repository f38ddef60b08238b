use serde::{Deserialize, Serialize};

/// Phase of the interactive turn loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    /// Waiting for the student.
    Idle,
    /// The request is on the wire.
    AwaitingModelResponse,
    /// Reply tokens are being consumed.
    Streaming,
    /// The turn failed and is being unwound.
    Failed,
}

/// Progress reported to the shell while a turn or a summary runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    StateChanged(TurnState),
    /// A chunk of the assistant reply.
    Delta(String),
    /// A transient problem that did not end the operation.
    Warning(String),
    /// Step `step` of `total` of the end-of-session summary.
    Progress { step: u8, total: u8, finished: bool },
}

/// Result of a completed end-of-session summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub evaluation: String,
    pub commentary: String,
}
