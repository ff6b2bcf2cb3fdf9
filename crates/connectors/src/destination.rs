use crate::error::DestinationError;
use async_trait::async_trait;
use model::records::tuple::DestinationTuple;

/// What a committed batch did to the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteReceipt {
    /// Tuples that became new rows.
    pub inserted: u64,
    /// Tuples dropped because their key already existed.
    pub discarded: u64,
}

/// A relational sink accepting batches of tuples atomically.
#[async_trait]
pub trait TupleDestination: Send {
    /// Writes `tuples` inside one transaction. Either every tuple is applied
    /// (inserted or discarded on conflict) and committed, or the transaction
    /// is rolled back and an error returned.
    async fn write_batch(
        &mut self,
        tuples: &[DestinationTuple],
    ) -> Result<WriteReceipt, DestinationError>;

    /// Releases the connection. Called once, on every exit path.
    async fn close(&mut self) -> Result<(), DestinationError>;
}
