//! HTTP server for the tag trends dashboard

use anyhow::Result;
use tagtrends::config::ServerConfig;
use tagtrends::http;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env()?;
    info!("Starting tag trends server...");

    if !config.data_dir.is_dir() {
        warn!(
            "Data directory {} does not exist yet - /data will return an error payload",
            config.data_dir.display()
        );
    }
    if config.strict_status {
        info!("Strict status mapping enabled - /data failures return 5xx");
    }

    http::serve(config).await?;
    Ok(())
}
