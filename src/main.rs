use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Instrument;

use mgmt_fleet::config::FleetConfig;
use mgmt_fleet::github::FleetClient;
use mgmt_fleet::orchestrator::BatchRunner;
use mgmt_fleet::poller::TokioSleeper;
use mgmt_fleet::telemetry::{create_batch_span, generate_batch_id, init_telemetry};

#[derive(Parser)]
#[command(name = "mgmt-fleet")]
#[command(about = "Run github-mgmt workflows across a fleet of organizations")]
#[command(
    long_about = "mgmt-fleet dispatches the sync or upgrade workflow on every managed \
                  organization's github-mgmt repository, waits for the runs to finish, and \
                  for upgrades additionally merges the resulting pull requests once their \
                  checks pass. Organizations default to the configured list when none are \
                  given."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dispatch the sync workflow on each organization and wait for completion
    Sync {
        /// Organizations to sync; defaults to the configured list
        orgs: Vec<String>,
    },
    /// Dispatch the upgrade workflow on each organization, then gate and
    /// squash-merge the upgrade PRs once all checks pass
    Upgrade {
        /// Organizations to upgrade; defaults to the configured list
        orgs: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    FleetConfig::load_env_file()?;
    init_telemetry()?;
    let config = FleetConfig::load()?;

    // The token is required before anything is dispatched; a missing
    // credential is a startup error, not something to discover mid-batch.
    let client = FleetClient::from_env()?;
    let sleeper = TokioSleeper;

    let outcome = tokio::runtime::Runtime::new()?.block_on(async {
        let runner = BatchRunner::new(&client, &sleeper, &config);
        let batch_id = generate_batch_id();
        match cli.command {
            Commands::Sync { orgs } => {
                runner
                    .run_sync(&orgs)
                    .instrument(create_batch_span("sync", &batch_id))
                    .await
            }
            Commands::Upgrade { orgs } => {
                runner
                    .run_upgrade(&orgs)
                    .instrument(create_batch_span("upgrade", &batch_id))
                    .await
            }
        }
    });

    if let Err(err) = outcome {
        tracing::error!(error = %err, "fleet batch aborted");
        eprintln!("❌ {err}");
        std::process::exit(1);
    }
    Ok(())
}
