use invoicing_api::{config::InvoicingConfig, services::init_metrics, Application};
use service_core::error::AppError;
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Load configuration - fail fast if invalid
    let config = InvoicingConfig::load()?;

    init_tracing("invoicing-api", "info", config.otlp_endpoint.as_deref());

    if let Err(e) = init_metrics() {
        tracing::warn!("Metrics disabled: {}", e);
    }

    tracing::info!(
        version = %env!("CARGO_PKG_VERSION"),
        environment = ?config.common.environment,
        store = ?config.store.backend,
        "Starting invoicing-api"
    );

    let application = Application::build(config).await?;
    application.run_until_stopped().await?;

    tracing::info!("invoicing-api stopped");
    Ok(())
}
