use connectors::error::{DestinationError, SourceError};
use engine_core::state::TransferState;
use thiserror::Error;

/// Causes that end a transfer in the `Aborted` state.
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("Source failed: {0}")]
    Source(#[from] SourceError),

    #[error("Destination failed: {0}")]
    Destination(#[from] DestinationError),

    #[error("Transfer cancelled")]
    Cancelled,

    #[error("Illegal state transition from {from} to {to}")]
    IllegalTransition {
        from: TransferState,
        to: TransferState,
    },
}

impl TransferError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransferError::Cancelled)
    }
}
