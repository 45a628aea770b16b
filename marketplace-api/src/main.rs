use marketplace_api::{config::Config, Application};
use marketplace_core::error::AppError;
use marketplace_core::middleware::install_metrics_recorder;
use marketplace_core::observability::init_tracing;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Fail fast on bad configuration
    let config = Config::load()?;

    init_tracing(
        &config.service_name,
        &config.log.level,
        config.log.format,
        config.log.otlp_endpoint.as_deref(),
    )?;

    install_metrics_recorder()?;

    tracing::info!(
        service = %config.service_name,
        version = env!("CARGO_PKG_VERSION"),
        "Starting marketplace API"
    );

    let application = Application::build(config).await?;
    application.run_until_stopped().await
}
