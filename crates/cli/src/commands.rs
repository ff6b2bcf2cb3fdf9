use clap::{Args, Subcommand, ValueEnum};
use engine_config::settings::SettingsOverrides;
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Query the aggregation and write it to Postgres
    Transfer {
        #[command(flatten)]
        args: TransferArgs,

        #[arg(long, help = "Stream and map the result without writing to Postgres")]
        dry_run: bool,

        #[arg(long, help = "Write the JSON run report to this file")]
        report: Option<PathBuf>,
    },
    /// Print the Flux query the transfer would submit
    Flux {
        #[command(flatten)]
        args: TransferArgs,
    },
    /// Check that one side of the transfer is reachable
    TestConn {
        #[arg(long, value_enum)]
        target: Target,
    },
}

/// Command-line overrides of the environment settings.
#[derive(Args, Debug, Default, Clone)]
pub struct TransferArgs {
    #[arg(long, help = "Tuples per transaction (overrides TRANSFER_BATCH_SIZE)")]
    pub batch_size: Option<usize>,

    #[arg(
        long,
        allow_hyphen_values = true,
        help = "Range start, a duration like -24h or an RFC 3339 time"
    )]
    pub start: Option<String>,

    #[arg(
        long,
        allow_hyphen_values = true,
        help = "Range stop, a duration or an RFC 3339 time"
    )]
    pub stop: Option<String>,

    #[arg(long, help = "Extra attempts for batches that hit lock contention")]
    pub retries: Option<usize>,
}

impl TransferArgs {
    pub fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            batch_size: self.batch_size,
            start: self.start.clone(),
            stop: self.stop.clone(),
            retries: self.retries,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Influx,
    Postgres,
}
