use abi::Config;
use anyhow::Result;
use reservation_service::{config_path, start_service};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let filename = config_path()?;
    info!(%filename, "loading config");
    let config = Config::load(&filename)?;
    start_service(&config).await
}
