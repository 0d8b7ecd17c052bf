pub mod client;
pub mod errors;
pub mod types;

pub use client::{FleetClient, FleetOps};
pub use errors::GitHubError;
