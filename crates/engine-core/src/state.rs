use serde::Serialize;
use std::fmt;

/// Lifecycle of one transfer run.
///
/// `Init → Streaming → (Flushing)* → FinalFlush → Done`, with `Aborted`
/// reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferState {
    Init,
    Streaming,
    Flushing,
    FinalFlush,
    Done,
    Aborted,
}

impl TransferState {
    pub fn can_transition_to(&self, next: TransferState) -> bool {
        use TransferState::*;
        match (self, next) {
            (Done | Aborted, _) => false,
            (_, Aborted) => true,
            (Init, Streaming) => true,
            (Streaming, Flushing | FinalFlush) => true,
            (Flushing, Streaming) => true,
            (FinalFlush, Done) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferState::Init => "init",
            TransferState::Streaming => "streaming",
            TransferState::Flushing => "flushing",
            TransferState::FinalFlush => "final_flush",
            TransferState::Done => "done",
            TransferState::Aborted => "aborted",
        }
    }
}

impl fmt::Display for TransferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
