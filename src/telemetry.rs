use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

/// Initialize structured logging. Events go to stderr so the per-org
/// progress narrative on stdout stays clean.
pub fn init_telemetry() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    Ok(())
}

/// Generate a correlation ID for linking all events of one batch run
pub fn generate_batch_id() -> String {
    Uuid::new_v4().to_string()
}

/// Create the root span for a batch, carrying the flow name and batch ID
pub fn create_batch_span(flow: &str, batch_id: &str) -> tracing::Span {
    tracing::info_span!("fleet_batch", flow = flow, batch.id = batch_id)
}
