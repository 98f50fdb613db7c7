use anyhow::Context;
use jobhub_app::{init_tracing, ScrapingService};
use jobhub_core::AppConfig;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting JobHub v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load_with_env().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;

    let service = ScrapingService::open(config)
        .await
        .context("failed to initialize scraping service")?;
    service.start().await.context("failed to start scheduler")?;

    let status = serde_json::to_string(&service.status().await)?;
    info!(%status, "service ready");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    info!("shutdown requested");
    service.shutdown().await;
    Ok(())
}
