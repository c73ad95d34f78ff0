//! Party room reservation service.
//!
//! Reads configuration from TOML (`~/.config/party-room/config.toml`, or the
//! path in `PARTY_ROOM_CONFIG`). See the `party-room` CLI for flags.

use tracing::{error, info};

use party_room::server::{init_tracing, ServerError, ServerHandle, ServerOptions};
use party_room::{default_config_path, AppConfig};

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let config_path = default_config_path();

    let config = match AppConfig::load(&config_path) {
        Ok(cfg) => {
            init_tracing(&cfg);
            info!("Configuration loaded from {}", config_path.display());
            cfg
        }
        Err(e) => {
            let cfg = AppConfig::default();
            init_tracing(&cfg);
            error!("Failed to load config: {}. Using defaults.", e);
            cfg
        }
    };

    let handle = ServerHandle::start(ServerOptions {
        config,
        ..Default::default()
    })
    .await?;
    handle.install_signal_handler();

    info!("Press Ctrl+C to shutdown gracefully.");
    handle.shutdown_signal().wait().await;
    handle.wait().await;

    Ok(())
}
