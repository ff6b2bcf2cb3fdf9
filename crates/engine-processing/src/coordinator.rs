use crate::{
    accumulator::BatchAccumulator,
    error::TransferError,
    mapper::RowMapper,
    writer::{BatchOutcome, BatchWriter},
};
use connectors::{
    destination::TupleDestination,
    source::{AggregateQuery, MeasurementSource},
};
use engine_config::settings::TransferSettings;
use engine_core::{retry::RetryPolicy, state::TransferState, statistics::RunStatistics};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How a transfer run ended.
#[derive(Debug)]
pub struct TransferOutcome {
    /// `Done` or `Aborted`.
    pub state: TransferState,
    pub stats: RunStatistics,
    /// Why the run aborted. `None` when it reached `Done`.
    pub fatal: Option<TransferError>,
}

impl TransferOutcome {
    /// A run that could not acquire its source or destination.
    pub fn aborted(cause: TransferError) -> Self {
        Self {
            state: TransferState::Aborted,
            stats: RunStatistics::new(),
            fatal: Some(cause),
        }
    }

    pub fn is_success(&self) -> bool {
        self.state == TransferState::Done
    }

    pub fn was_cancelled(&self) -> bool {
        self.fatal.as_ref().is_some_and(TransferError::is_cancelled)
    }
}

/// Drives one transfer: a single source query, streamed through the mapper
/// into batches that are written one at a time, in formation order.
pub struct TransferCoordinator<S, D> {
    source: S,
    writer: BatchWriter<D>,
    mapper: RowMapper,
    accumulator: BatchAccumulator,
    query: AggregateQuery,
    state: TransferState,
    stats: RunStatistics,
    cancel: CancellationToken,
}

impl<S, D> TransferCoordinator<S, D>
where
    S: MeasurementSource,
    D: TupleDestination,
{
    pub fn new(
        source: S,
        destination: D,
        query: AggregateQuery,
        mapper: RowMapper,
        batch_size: usize,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            source,
            writer: BatchWriter::new(destination, retry),
            mapper,
            accumulator: BatchAccumulator::new(batch_size),
            query,
            state: TransferState::Init,
            stats: RunStatistics::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn from_settings(source: S, destination: D, settings: &TransferSettings) -> Self {
        Self::new(
            source,
            destination,
            settings.query.clone(),
            RowMapper::new(settings.dimension_keys.clone(), settings.missing_dimension),
            settings.batch_size,
            settings.retry.clone(),
        )
    }

    /// Cancellation is honoured at batch boundaries only.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs the transfer to a terminal state. Source and destination are
    /// closed exactly once whichever way the run ends.
    pub async fn run(mut self) -> TransferOutcome {
        info!(
            bucket = %self.query.bucket,
            batch_size = self.accumulator.capacity(),
            "Starting transfer"
        );

        let result = self.execute().await;
        self.release().await;

        let fatal = match result {
            Ok(()) => {
                info!(
                    rows_read = self.stats.rows_read(),
                    rows_skipped = self.stats.rows_skipped(),
                    batches_committed = self.stats.batches_committed(),
                    batches_rolled_back = self.stats.batches_rolled_back(),
                    tuples_inserted = self.stats.tuples_inserted(),
                    tuples_discarded = self.stats.tuples_discarded(),
                    "Transfer finished"
                );
                None
            }
            Err(err) => {
                // Aborted is reachable from every non-terminal state.
                self.state = TransferState::Aborted;
                if err.is_cancelled() {
                    warn!(rows_read = self.stats.rows_read(), "Transfer cancelled");
                } else {
                    error!(
                        error = %err,
                        rows_read = self.stats.rows_read(),
                        batches_committed = self.stats.batches_committed(),
                        "Transfer aborted"
                    );
                }
                Some(err)
            }
        };

        TransferOutcome {
            state: self.state,
            stats: self.stats,
            fatal,
        }
    }

    async fn execute(&mut self) -> Result<(), TransferError> {
        let rows = self.source.query(&self.query).await?;
        self.transition(TransferState::Streaming)?;

        for row in rows {
            let row = row?;
            match self.mapper.map(&row) {
                Ok(tuple) => {
                    self.stats.record_mapped();
                    if self.accumulator.add(tuple) {
                        self.flush().await?;
                    }
                }
                Err(err) => {
                    self.stats.record_skipped();
                    warn!(table = row.table, error = %err, "Row skipped");
                }
            }
        }

        self.final_flush().await?;
        self.transition(TransferState::Done)
    }

    async fn flush(&mut self) -> Result<(), TransferError> {
        self.check_cancelled()?;
        self.transition(TransferState::Flushing)?;
        self.write_pending().await?;
        self.transition(TransferState::Streaming)
    }

    async fn final_flush(&mut self) -> Result<(), TransferError> {
        self.check_cancelled()?;
        self.transition(TransferState::FinalFlush)?;
        debug!(pending = self.accumulator.len(), "Final flush");
        if !self.accumulator.is_empty() {
            self.write_pending().await?;
        }
        Ok(())
    }

    async fn write_pending(&mut self) -> Result<(), TransferError> {
        let batch = self.accumulator.drain();
        let seq = batch.seq;

        match self.writer.write(batch).await? {
            BatchOutcome::Committed {
                receipt, attempts, ..
            } => {
                self.stats
                    .record_committed(receipt.inserted, receipt.discarded, attempts);
                info!(
                    seq,
                    rows_read = self.stats.rows_read(),
                    tuples_committed = self.stats.tuples_committed(),
                    "Transfer progress"
                );
            }
            BatchOutcome::RolledBack {
                tuples, attempts, ..
            } => {
                self.stats.record_rolled_back(tuples as u64, attempts);
            }
        }
        Ok(())
    }

    fn check_cancelled(&self) -> Result<(), TransferError> {
        if self.cancel.is_cancelled() {
            return Err(TransferError::Cancelled);
        }
        Ok(())
    }

    fn transition(&mut self, next: TransferState) -> Result<(), TransferError> {
        if !self.state.can_transition_to(next) {
            return Err(TransferError::IllegalTransition {
                from: self.state,
                to: next,
            });
        }
        debug!(from = %self.state, to = %next, "Transfer state change");
        self.state = next;
        Ok(())
    }

    async fn release(&mut self) {
        if let Err(err) = self.source.close().await {
            warn!(error = %err, "Failed to close source");
        }
        if let Err(err) = self.writer.close().await {
            warn!(error = %err, "Failed to close destination");
        }
    }
}
