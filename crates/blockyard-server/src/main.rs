//! Blockyard server binary.
//!
//! Run with: `cargo run -p blockyard-server -- --port 8080`

use blockyard_config::{CliArgs, Config, default_config_dir};
use blockyard_server::ServerError;
use clap::Parser;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let args = CliArgs::parse();

    let config_dir = args.config.clone().unwrap_or_else(default_config_dir);
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config
        .debug
        .log_dir
        .clone()
        .unwrap_or_else(|| config_dir.join("logs"));
    blockyard_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    info!("Blockyard {}", env!("CARGO_PKG_VERSION"));
    info!("Config directory: {}", config_dir.display());

    if let Err(e) = blockyard_server::run(config).await {
        error!("Server failed: {e}");
        return Err(e);
    }
    Ok(())
}
