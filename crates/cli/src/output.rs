use crate::error::CliError;
use engine_config::report::TransferReport;
use std::{error::Error, path::Path};

/// Human-readable summary of a finished run.
pub fn summary_lines(report: &TransferReport) -> Vec<String> {
    let stats = &report.statistics;
    let mode = if report.dry_run { " (dry run)" } else { "" };

    let mut lines = vec![
        format!("Transfer {}{mode}", report.state),
        format!(
            "{:<20} {} read, {} mapped, {} skipped",
            "Rows",
            stats.rows_read(),
            stats.rows_mapped(),
            stats.rows_skipped()
        ),
        format!(
            "{:<20} {} committed, {} rolled back",
            "Batches",
            stats.batches_committed(),
            stats.batches_rolled_back()
        ),
        format!(
            "{:<20} {} inserted, {} already present, {} lost",
            "Tuples",
            stats.tuples_inserted(),
            stats.tuples_discarded(),
            stats.tuples_rolled_back()
        ),
    ];
    if stats.batch_retries() > 0 {
        lines.push(format!("{:<20} {}", "Batch retries", stats.batch_retries()));
    }
    if let Some(ms) = report.duration_ms() {
        lines.push(format!("{:<20} {ms} ms", "Duration"));
    }
    if let Some(fatal) = &report.fatal {
        lines.push(format!("{:<20} {fatal}", "Aborted by"));
    }
    lines
}

pub fn print_summary(report: &TransferReport) {
    for line in summary_lines(report) {
        println!("{line}");
    }
}

pub async fn write_report(report: &TransferReport, path: &Path) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(report)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

/// The error and its sources, outermost first. Sources whose message is
/// already embedded in the previous level are left out.
pub fn error_chain(err: &dyn Error) -> String {
    let mut chain = err.to_string();
    let mut last = chain.clone();
    let mut source = err.source();

    while let Some(cause) = source {
        let message = cause.to_string();
        if !last.contains(&message) {
            chain.push_str(": ");
            chain.push_str(&message);
        }
        last = message;
        source = cause.source();
    }
    chain
}
