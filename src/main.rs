//! Lounge Relay: binary entrypoint
//! Loads `.env`, sets up logging, validates config and runs the gateway client.

use lounge_relay::{config, gateway, logging, metrics, RelayConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();

    if let Err(e) = logging::init(&config::log_dir_from_env()) {
        eprintln!("logging setup failed: {e:#}");
    }

    let cfg = match RelayConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("{e:#}");
            std::process::exit(1);
        }
    };
    info!(?cfg, "configuration loaded");

    if let Some(addr) = cfg.metrics_addr {
        if let Err(e) = metrics::install_exporter(addr) {
            error!("metrics exporter not started: {e:#}");
        }
    }

    if let Err(e) = gateway::run(cfg).await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}
