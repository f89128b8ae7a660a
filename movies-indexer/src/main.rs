use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing::{error, info, warn};

use movies_indexer::{telemetry, Dependencies, IndexingError, LogFormat, Settings};

#[derive(Parser)]
#[command(name = "movies-indexer")]
#[command(about = "Keeps the movies search indices in sync with PostgreSQL", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Index every entity changed since it was last indexed (default)
    Sync,
    /// Recreate the configured indices for a full resync
    InitIndex {
        /// Keep the indexed_at watermarks instead of resetting them
        #[arg(long)]
        keep_watermarks: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let log_format = match LogFormat::from_env() {
        Ok(format) => format,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    telemetry::init(log_format);

    match run(cli.command.unwrap_or(Commands::Sync)).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %e, "Movies indexer failed");
            ExitCode::FAILURE
        }
    }
}

/// Run a command, returning whether it completed cleanly.
async fn run(command: Commands) -> Result<bool, IndexingError> {
    let settings = Settings::from_env()?;
    let deps = Dependencies::new(&settings).await?;

    match command {
        Commands::Sync => {
            let shutdown = deps.orchestrator.shutdown_handle();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, stopping after the current step");
                    shutdown.signal();
                }
            });

            let report = deps.orchestrator.run().await;
            Ok(report.is_success())
        }
        Commands::InitIndex { keep_watermarks } => {
            let outcomes = deps
                .bootstrap
                .run(&settings.entities, !keep_watermarks)
                .await?;

            for outcome in outcomes {
                info!(
                    entity = %outcome.kind,
                    index = outcome.kind.index_name(),
                    reset = ?outcome.reset,
                    "Index initialized"
                );
            }
            Ok(true)
        }
    }
}
