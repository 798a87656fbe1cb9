//! # Action Framework Sample
//!
//! Runs every [`Scenario`] on a fresh client/server pair and reports what the root caller
//! received.
//!
//! ## Quick Start
//!
//! ```bash
//! RUST_LOG=info cargo run -p action-sample
//! ACTION_TIMEOUT_MS=200 RUST_LOG=debug cargo run -p action-sample
//! ```
//!
//! Nodes run undead: a failure nobody observes is logged instead of closing the node.

use action_framework::tracing::setup_tracing;
use action_framework::Config;
use action_sample::error::SampleError;
use action_sample::lifecycle::ChainSystem;
use action_sample::scenario::Scenario;
use tracing::{error, info, Instrument};

#[tokio::main]
async fn main() -> Result<(), SampleError> {
    setup_tracing();

    let config = Config::from_env().undead();
    info!(timeout_ms = config.default_timeout_ms, "Starting scenarios");

    for scenario in Scenario::ALL {
        let span = tracing::info_span!("scenario", name = scenario.name());
        async {
            let system = ChainSystem::start(scenario, config.clone()).await?;
            let completion = system.run().await;

            let outcome = match &completion {
                Ok(result) => {
                    info!(%result, "Root call succeeded");
                    format!("ok {result}")
                }
                Err(err) => {
                    error!(kind = %err.kind, error = %err.message, chain = ?err.chain_labels(), "Root call failed");
                    format!("{err}")
                }
            };
            info!(observations = system.log.all().len(), "Errors observed along the way");
            system.shutdown().await?;

            if completion.is_err() != scenario.expects_error() {
                return Err(SampleError::Unexpected { scenario, outcome });
            }
            Ok::<(), SampleError>(())
        }
        .instrument(span)
        .await?;
    }

    info!("All scenarios completed");
    Ok(())
}
