use connectors::error::{DestinationError, SourceError};
use engine_config::error::SettingsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to load environment: {0}")]
    Config(String),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("InfluxDB error: {0}")]
    Source(#[from] SourceError),

    #[error("PostgreSQL error: {0}")]
    Destination(#[from] DestinationError),

    #[error("Failed to write the report: {0}")]
    ReportWrite(#[from] std::io::Error),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),
}
