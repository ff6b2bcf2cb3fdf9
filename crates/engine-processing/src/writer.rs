use connectors::{
    destination::{TupleDestination, WriteReceipt},
    error::{DestinationError, FailureKind},
};
use engine_core::retry::{RetryDisposition, RetryPolicy};
use model::records::batch::Batch;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Result of a batch that did not lose the destination.
#[derive(Debug)]
pub enum BatchOutcome {
    Committed {
        receipt: WriteReceipt,
        attempts: usize,
        duration: Duration,
    },
    /// The transaction was rolled back; none of its tuples were applied.
    RolledBack {
        tuples: usize,
        error: DestinationError,
        attempts: usize,
    },
}

/// Writes one batch per transaction, re-attempting transient failures as the
/// retry policy allows.
pub struct BatchWriter<D> {
    destination: D,
    retry: RetryPolicy,
}

impl<D: TupleDestination> BatchWriter<D> {
    pub fn new(destination: D, retry: RetryPolicy) -> Self {
        Self { destination, retry }
    }

    /// Commits the batch or rolls it back. Connection-level failures are
    /// returned as `Err`; everything else is reported in the outcome.
    pub async fn write(&mut self, batch: Batch) -> Result<BatchOutcome, DestinationError> {
        let start = Instant::now();
        let rows = batch.len();
        let mut attempts = 1;

        let result = loop {
            match self.destination.write_batch(&batch.tuples).await {
                Ok(receipt) => break Ok(receipt),
                Err(err) => {
                    if classify_destination_error(&err) == RetryDisposition::Retry
                        && self.retry.wait_before_retry(attempts).await
                    {
                        attempts += 1;
                        continue;
                    }
                    break Err(err);
                }
            }
        };

        match result {
            Ok(receipt) => {
                let duration = start.elapsed();
                info!(
                    batch_id = %batch.id,
                    seq = batch.seq,
                    rows,
                    inserted = receipt.inserted,
                    discarded = receipt.discarded,
                    attempts,
                    duration_ms = duration.as_millis() as u64,
                    "Batch committed"
                );
                Ok(BatchOutcome::Committed {
                    receipt,
                    attempts,
                    duration,
                })
            }
            Err(error) => {
                if error.is_fatal() {
                    error!(
                        batch_id = %batch.id,
                        seq = batch.seq,
                        rows,
                        error = %error,
                        "Destination lost while writing batch"
                    );
                    return Err(error);
                }

                error!(
                    batch_id = %batch.id,
                    seq = batch.seq,
                    rows,
                    attempts,
                    duration_ms = start.elapsed().as_millis() as u64,
                    error = %error,
                    "Batch rolled back"
                );
                Ok(BatchOutcome::RolledBack {
                    tuples: rows,
                    error,
                    attempts,
                })
            }
        }
    }

    pub async fn close(&mut self) -> Result<(), DestinationError> {
        self.destination.close().await
    }
}

/// Only transient failures are worth another attempt.
pub fn classify_destination_error(err: &DestinationError) -> RetryDisposition {
    match err.kind() {
        FailureKind::Transient => RetryDisposition::Retry,
        FailureKind::Connection | FailureKind::Data => RetryDisposition::Stop,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::mocks::{Failure, MockDestination, tuples};
    use tracing_test::traced_test;

    fn no_wait(attempts: usize) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::ZERO, Duration::ZERO)
    }

    #[traced_test]
    #[tokio::test]
    async fn commits_and_reports_receipt() {
        let dest = MockDestination::new();
        let mut writer = BatchWriter::new(dest.clone(), RetryPolicy::default());

        let outcome = writer.write(Batch::new(1, tuples(0..4))).await.unwrap();
        match outcome {
            BatchOutcome::Committed {
                receipt, attempts, ..
            } => {
                assert_eq!(receipt.inserted, 4);
                assert_eq!(attempts, 1);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(dest.row_count(), 4);
        assert!(logs_contain("Batch committed"));
    }

    #[traced_test]
    #[tokio::test]
    async fn data_failure_rolls_back_without_retry() {
        let dest = MockDestination::new().fail_call(1, Failure::Reject);
        let mut writer = BatchWriter::new(dest.clone(), no_wait(5));

        let outcome = writer.write(Batch::new(1, tuples(0..3))).await.unwrap();
        assert!(matches!(
            outcome,
            BatchOutcome::RolledBack {
                tuples: 3,
                attempts: 1,
                ..
            }
        ));
        assert_eq!(dest.calls(), 1);
        assert_eq!(dest.row_count(), 0);
        assert!(logs_contain("Batch rolled back"));
    }

    #[tokio::test]
    async fn transient_failure_is_retried() {
        let dest = MockDestination::new().fail_call(1, Failure::Contended);
        let mut writer = BatchWriter::new(dest.clone(), no_wait(2));

        let outcome = writer.write(Batch::new(1, tuples(0..2))).await.unwrap();
        assert!(matches!(
            outcome,
            BatchOutcome::Committed { attempts: 2, .. }
        ));
        assert_eq!(dest.row_count(), 2);
    }

    #[tokio::test]
    async fn transient_failure_rolls_back_once_attempts_run_out() {
        let dest = MockDestination::new()
            .fail_call(1, Failure::Contended)
            .fail_call(2, Failure::Contended);
        let mut writer = BatchWriter::new(dest.clone(), no_wait(2));

        let outcome = writer.write(Batch::new(1, tuples(0..2))).await.unwrap();
        assert!(matches!(
            outcome,
            BatchOutcome::RolledBack { attempts: 2, .. }
        ));
        assert_eq!(dest.calls(), 2);
        assert_eq!(dest.row_count(), 0);
    }

    #[tokio::test]
    async fn lost_connection_is_an_error() {
        let dest = MockDestination::new().lost_after(0);
        let mut writer = BatchWriter::new(dest.clone(), no_wait(3));

        let err = writer.write(Batch::new(1, tuples(0..2))).await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(dest.calls(), 1);
    }
}
