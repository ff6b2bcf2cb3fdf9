use crate::{
    destination::{TupleDestination, WriteReceipt},
    error::DestinationError,
};
use async_trait::async_trait;
use model::records::tuple::DestinationTuple;
use tracing::debug;

/// Destination used for dry runs: accepts every batch and writes nothing.
#[derive(Debug, Default)]
pub struct DiscardDestination {
    batches: u64,
    tuples: u64,
    closed: bool,
}

impl DiscardDestination {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> u64 {
        self.batches
    }

    pub fn tuples(&self) -> u64 {
        self.tuples
    }
}

#[async_trait]
impl TupleDestination for DiscardDestination {
    async fn write_batch(
        &mut self,
        tuples: &[DestinationTuple],
    ) -> Result<WriteReceipt, DestinationError> {
        if self.closed {
            return Err(DestinationError::Closed);
        }
        self.batches += 1;
        self.tuples += tuples.len() as u64;
        debug!(rows = tuples.len(), "Dry run, batch discarded");

        Ok(WriteReceipt {
            inserted: tuples.len() as u64,
            discarded: 0,
        })
    }

    async fn close(&mut self) -> Result<(), DestinationError> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuple(user: &str) -> DestinationTuple {
        DestinationTuple {
            company: "acme".into(),
            project: "apollo".into(),
            cohort: "q1".into(),
            user: user.into(),
            stage: "build".into(),
            version_tag: "17".into(),
            value: 1.0,
        }
    }

    #[tokio::test]
    async fn counts_and_accepts_everything() {
        let mut dest = DiscardDestination::new();
        let receipt = dest.write_batch(&[tuple("a"), tuple("b")]).await.unwrap();
        assert_eq!(receipt.inserted, 2);
        assert_eq!(dest.batches(), 1);
        assert_eq!(dest.tuples(), 2);

        dest.close().await.unwrap();
        assert!(matches!(
            dest.write_batch(&[tuple("c")]).await,
            Err(DestinationError::Closed)
        ));
    }
}
