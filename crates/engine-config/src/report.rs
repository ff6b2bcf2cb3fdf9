use crate::settings::TransferSettings;
use chrono::{DateTime, Utc};
use engine_core::{state::TransferState, statistics::RunStatistics};
use serde::Serialize;

/// Machine-readable record of one transfer run, written by `--report`.
#[derive(Serialize, Debug, Clone)]
pub struct TransferReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub dry_run: bool,
    pub state: TransferState,
    pub bucket: String,
    pub table: String,
    pub batch_size: usize,
    pub statistics: RunStatistics,
    /// Cause of an aborted run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fatal: Option<String>,
}

impl TransferReport {
    pub fn begin(settings: &TransferSettings, dry_run: bool) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            finished_at: None,
            dry_run,
            state: TransferState::Init,
            bucket: settings.query.bucket.clone(),
            table: settings.target.table.clone(),
            batch_size: settings.batch_size,
            statistics: RunStatistics::default(),
            fatal: None,
        }
    }

    pub fn finish(&mut self, state: TransferState, statistics: RunStatistics, fatal: Option<String>) {
        self.finished_at = Some(Utc::now());
        self.state = state;
        self.statistics = statistics;
        self.fatal = fatal;
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.finished_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }

    pub fn is_success(&self) -> bool {
        self.state == TransferState::Done
    }
}
