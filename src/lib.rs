// mgmt-fleet - dispatch, watch, and merge github-mgmt workflows across
// organizations. The library surface exists so the orchestration flows can
// be exercised against in-process fakes.

pub mod config;
pub mod error;
pub mod github;
pub mod orchestrator;
pub mod poller;
pub mod telemetry;

// Re-export key types for easy access
pub use config::FleetConfig;
pub use error::FleetError;
pub use github::{FleetClient, FleetOps, GitHubError};
pub use orchestrator::{BatchRunner, JobOrchestrator, PrGate};
pub use poller::{Poller, Sleeper, TokioSleeper};
pub use telemetry::{create_batch_span, generate_batch_id, init_telemetry};
