use crate::{
    commands::{Commands, Target, TransferArgs},
    conn::{ConnectionPinger, InfluxPinger, PostgresPinger},
    env::EnvManager,
    error::CliError,
    shutdown::{ExitCode, ShutdownCoordinator},
};
use clap::Parser;
use connectors::{
    discard::DiscardDestination, influx::InfluxSource, postgres::PgDestination,
    source::MeasurementSource,
};
use engine_config::{report::TransferReport, settings::TransferSettings};
use engine_processing::coordinator::{TransferCoordinator, TransferOutcome};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

mod commands;
mod conn;
mod env;
mod error;
mod logging;
mod output;
mod shutdown;

#[derive(Parser, Debug)]
#[command(
    name = "bucketsync",
    version,
    about = "Copies aggregated InfluxDB measurements into PostgreSQL"
)]
struct Cli {
    #[arg(long, global = true, default_value = "info", help = "Log level when RUST_LOG is unset")]
    log_level: String,

    #[arg(long, global = true, help = "Read additional KEY=VALUE settings from this file")]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let code = match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            error!(error = %output::error_chain(&err), "bucketsync failed");
            eprintln!("Error: {}", output::error_chain(&err));
            ExitCode::GeneralError
        }
    };

    std::process::exit(code.as_i32());
}

async fn run(cli: Cli) -> Result<ExitCode, CliError> {
    let mut env = EnvManager::new();
    if let Some(path) = &cli.env_file {
        env.load_from_file(path)?;
    }

    match cli.command {
        Commands::Transfer {
            args,
            dry_run,
            report,
        } => transfer(&env, &args, dry_run, report).await,
        Commands::Flux { args } => {
            let settings = TransferSettings::resolve(env.all(), &args.overrides())?;
            println!("{}", settings.query.to_flux());
            Ok(ExitCode::Success)
        }
        Commands::TestConn { target } => {
            let settings = TransferSettings::from_vars(env.all())?;
            match target {
                Target::Influx => {
                    InfluxPinger {
                        connection: settings.influx,
                    }
                    .ping()
                    .await?
                }
                Target::Postgres => {
                    PostgresPinger {
                        config: settings.postgres,
                        target: settings.target,
                    }
                    .ping()
                    .await?
                }
            }
            Ok(ExitCode::Success)
        }
    }
}

async fn transfer(
    env: &EnvManager,
    args: &TransferArgs,
    dry_run: bool,
    report_path: Option<PathBuf>,
) -> Result<ExitCode, CliError> {
    let settings = TransferSettings::resolve(env.all(), &args.overrides())?;
    info!(?settings, dry_run, "Resolved transfer settings");

    let shutdown = ShutdownCoordinator::new(CancellationToken::new());
    shutdown.register_handlers();

    let mut report = TransferReport::begin(&settings, dry_run);
    let outcome = execute(&settings, dry_run, shutdown.cancel_token()).await;

    let code = ExitCode::for_outcome(&outcome, shutdown.is_shutdown_requested());
    let TransferOutcome {
        state,
        stats,
        fatal,
    } = outcome;

    let fatal = fatal.map(|err| output::error_chain(&err));
    if let Some(cause) = &fatal {
        error!(%cause, "Transfer did not complete");
    }
    report.finish(state, stats, fatal);

    output::print_summary(&report);
    if let Some(path) = report_path {
        output::write_report(&report, &path).await?;
        info!(path = %path.display(), "Report written");
    }

    Ok(code)
}

/// Acquires both sides and runs the transfer. Failing to acquire either side
/// aborts the run with empty statistics.
async fn execute(
    settings: &TransferSettings,
    dry_run: bool,
    cancel: CancellationToken,
) -> TransferOutcome {
    let mut source = match InfluxSource::connect(settings.influx.clone()) {
        Ok(source) => source,
        Err(err) => return TransferOutcome::aborted(err.into()),
    };

    if dry_run {
        return TransferCoordinator::from_settings(source, DiscardDestination::new(), settings)
            .with_cancellation(cancel)
            .run()
            .await;
    }

    match PgDestination::connect(settings.postgres.clone(), settings.target.clone()).await {
        Ok(destination) => {
            TransferCoordinator::from_settings(source, destination, settings)
                .with_cancellation(cancel)
                .run()
                .await
        }
        Err(err) => {
            if let Err(close_err) = source.close().await {
                warn!(error = %close_err, "Failed to close source");
            }
            TransferOutcome::aborted(err.into())
        }
    }
}
