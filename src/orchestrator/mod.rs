pub mod batch;
pub mod job;
pub mod pr_gate;

pub use batch::BatchRunner;
pub use job::{JobOrchestrator, JobPhase};
pub use pr_gate::PrGate;
