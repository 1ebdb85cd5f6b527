//! Command-line entrypoint.
//!
//! Exit behavior: non-zero only on fatal errors (bad configuration, an
//! unreachable remote). A cleanup run where individual deletes failed exits
//! zero; the failed count in the summary is the operator's signal.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cloudkeeper::config::Config;
use cloudkeeper::remote::HttpRemoteClient;
use cloudkeeper::run::{run_cleanup, run_inventory};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Cloud tenancy housekeeping: resource inventory and backup retention",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to the TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level filter (overrides RUST_LOG), e.g. "debug"
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export every resource in the tenancy to a CSV report
    Inventory {
        /// Tenancy root OCID
        #[arg(long)]
        tenancy_id: Option<String>,

        /// Limit the search to one compartment
        #[arg(long)]
        compartment_id: Option<String>,

        /// Filter by lifecycle state, e.g. ACTIVE
        #[arg(long)]
        lifecycle_state: Option<String>,

        /// Report path (defaults to a timestamped file)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete excess volume backups, keeping the newest N per volume
    Cleanup {
        /// Compartment whose backups are scanned
        #[arg(short = 'C', long)]
        compartment_id: Option<String>,

        /// Number of newest backups to keep per volume (>= 1)
        #[arg(short, long)]
        keep: Option<u32>,

        /// Log what would be deleted without calling the remote API
        #[arg(long)]
        dry_run: bool,

        /// Only process boot volume backups
        #[arg(long, conflicts_with = "block_only")]
        boot_only: bool,

        /// Only process block volume backups
        #[arg(long)]
        block_only: bool,

        /// Sleep between delete calls, in milliseconds
        #[arg(long)]
        pacing_ms: Option<u64>,
    },
}

fn init_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "run failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Command::Inventory {
            tenancy_id,
            compartment_id,
            lifecycle_state,
            output,
        } => {
            let inv = &mut config.inventory;
            if let Some(value) = tenancy_id {
                inv.tenancy_id = value;
            }
            if compartment_id.is_some() {
                inv.compartment_id = compartment_id;
            }
            if lifecycle_state.is_some() {
                inv.lifecycle_state = lifecycle_state;
            }
            if output.is_some() {
                inv.output = output;
            }

            let client = HttpRemoteClient::new(&config.remote)?;
            let summary = run_inventory(&client, &config.inventory, &config.retry).await?;
            tracing::info!(
                resources = summary.total_resources,
                compartments = summary.compartments_resolved,
                report = summary
                    .report_path
                    .as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
                "inventory complete"
            );
        }
        Command::Cleanup {
            compartment_id,
            keep,
            dry_run,
            boot_only,
            block_only,
            pacing_ms,
        } => {
            let cleanup = &mut config.cleanup;
            if let Some(value) = compartment_id {
                cleanup.compartment_id = value;
            }
            if let Some(value) = keep {
                cleanup.keep_count = value;
            }
            if dry_run {
                cleanup.dry_run = true;
            }
            if boot_only {
                cleanup.boot_only = true;
            }
            if block_only {
                cleanup.block_only = true;
            }
            if let Some(value) = pacing_ms {
                cleanup.pacing_ms = value;
            }

            let client = HttpRemoteClient::new(&config.remote)?;
            let summary = run_cleanup(&client, &config.cleanup, &config.retry).await?;
            tracing::info!(
                scanned = summary.total_scanned,
                kept = summary.total_kept,
                deleted = summary.total_deleted,
                failed = summary.total_failed,
                dry_run = summary.total_dry_run,
                "cleanup complete"
            );
        }
    }

    Ok(())
}
