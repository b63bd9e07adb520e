use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use phishguard::api::start_api_server;
use phishguard::config::{setup_logging, Config};
use phishguard::store::Store;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load Config
    let config_path = std::env::args().nth(1).unwrap_or("config.toml".to_string());
    let config = if std::path::Path::new(&config_path).exists() {
        Config::load(&config_path).await?
    } else {
        Config::default()
    };

    // 2. Setup Logging
    setup_logging(&config);
    info!("Starting phishguard...");

    if !std::path::Path::new(&config_path).exists() {
        info!("Config file not found, using defaults.");
    }

    // 3. Open Store & Initialize Schema
    let store = Arc::new(Store::open(&config.database_path)?);
    store.init_schema()?;
    info!("Store opened at {}", config.database_path);

    // 4. Start API Server (blocks until shutdown signal)
    start_api_server(store, config).await;

    Ok(())
}
