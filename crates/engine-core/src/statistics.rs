use serde::Serialize;

/// Run-level counters, owned and mutated by the transfer coordinator only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStatistics {
    rows_read: u64,
    rows_mapped: u64,
    rows_skipped: u64,
    batches_committed: u64,
    batches_rolled_back: u64,
    tuples_inserted: u64,
    tuples_discarded: u64,
    tuples_rolled_back: u64,
    batch_retries: u64,
}

impl RunStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_mapped(&mut self) {
        self.rows_read += 1;
        self.rows_mapped += 1;
    }

    pub fn record_skipped(&mut self) {
        self.rows_read += 1;
        self.rows_skipped += 1;
    }

    /// `inserted` counts tuples that became new destination rows, `discarded`
    /// those dropped by the conflict policy.
    pub fn record_committed(&mut self, inserted: u64, discarded: u64, attempts: usize) {
        self.batches_committed += 1;
        self.tuples_inserted += inserted;
        self.tuples_discarded += discarded;
        self.batch_retries += attempts.saturating_sub(1) as u64;
    }

    pub fn record_rolled_back(&mut self, tuples: u64, attempts: usize) {
        self.batches_rolled_back += 1;
        self.tuples_rolled_back += tuples;
        self.batch_retries += attempts.saturating_sub(1) as u64;
    }

    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    pub fn rows_mapped(&self) -> u64 {
        self.rows_mapped
    }

    pub fn rows_skipped(&self) -> u64 {
        self.rows_skipped
    }

    pub fn batches_committed(&self) -> u64 {
        self.batches_committed
    }

    pub fn batches_rolled_back(&self) -> u64 {
        self.batches_rolled_back
    }

    pub fn tuples_inserted(&self) -> u64 {
        self.tuples_inserted
    }

    pub fn tuples_discarded(&self) -> u64 {
        self.tuples_discarded
    }

    pub fn tuples_rolled_back(&self) -> u64 {
        self.tuples_rolled_back
    }

    pub fn batch_retries(&self) -> u64 {
        self.batch_retries
    }

    /// Tuples whose batch committed, inserted or discarded on conflict.
    pub fn tuples_committed(&self) -> u64 {
        self.tuples_inserted + self.tuples_discarded
    }

    /// True when some rows or batches were lost without the run aborting.
    pub fn has_partial_failures(&self) -> bool {
        self.rows_skipped > 0 || self.batches_rolled_back > 0
    }

    /// Every row read was either mapped or skipped.
    pub fn is_consistent(&self) -> bool {
        self.rows_mapped + self.rows_skipped == self.rows_read
    }
}
