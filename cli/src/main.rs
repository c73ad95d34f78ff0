//! Party Room: CLI server
//!
//! Headless reservation service suitable for a systemd unit, a container,
//! or a standalone process.
//!
//! ```sh
//! # Run with default config (~/.config/party-room/config.toml)
//! party-room
//!
//! # Custom config path and port
//! party-room --config /etc/party-room/config.toml --api-port 8081
//!
//! # Validate config without starting
//! party-room --check
//!
//! # Remove cancelled reservations dated before 2030-01-01, then exit
//! party-room --purge-before 2030-01-01
//! ```

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;
use tracing::{error, info};

use party_room::config::{AppConfig, CONFIG_ENV_VAR};
use party_room::server::{init_tracing, run_purge, ServerError, ServerHandle, ServerOptions};

/// Party room reservation service.
#[derive(Parser, Debug)]
#[command(
    name = "party-room",
    version,
    about = "Reservation calendar for a condominium party room",
    long_about = "REST API server for booking the shared party room.\n\n\
                  Default config: ~/.config/party-room/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Override the REST API listen port.
    #[arg(long)]
    api_port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration file and exit without starting the server.
    #[arg(long)]
    check: bool,

    /// Skip database migrations on startup.
    #[arg(long)]
    no_migrate: bool,

    /// Skip creating the default admin user.
    #[arg(long)]
    no_admin: bool,

    /// Delete cancelled reservations dated before DATE (YYYY-MM-DD) and exit.
    #[arg(long, value_name = "DATE")]
    purge_before: Option<NaiveDate>,
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let cli = Cli::parse();

    // ── Load configuration ─────────────────────────────────────
    let config_path = cli
        .config
        .unwrap_or_else(party_room::default_config_path);

    let loaded = AppConfig::load(&config_path);

    let mut config = match &loaded {
        Ok(cfg) => cfg.clone(),
        Err(_) => AppConfig::default(),
    };

    // log level override must land before tracing starts
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }
    init_tracing(&config);

    match loaded {
        Ok(_) => info!("Configuration loaded from {}", config_path.display()),
        Err(e) => {
            if cli.check {
                error!("Invalid configuration in {}: {}", config_path.display(), e);
                return Err(e.into());
            }
            error!("Failed to load config from {}: {}", config_path.display(), e);
            error!("Using default configuration.");
        }
    }

    // ── Apply CLI overrides ────────────────────────────────────
    if let Some(port) = cli.api_port {
        info!("CLI override: api_port = {}", port);
        config.server.api_port = port;
    }

    // ── Config validation mode ─────────────────────────────────
    if cli.check {
        config.validate()?;
        println!("Configuration is valid");
        println!("   Config file   : {}", config_path.display());
        println!("   API address   : {}", config.api_address());
        println!("   Database      : {}", config.database.url);
        println!("   Log level     : {}", config.logging.level);
        println!(
            "   Booking hours : {:02}:00-{:02}:00",
            config.booking.opening_hour, config.booking.closing_hour
        );
        return Ok(());
    }

    // ── One-shot purge ─────────────────────────────────────────
    if let Some(before) = cli.purge_before {
        let deleted = run_purge(&config, Some(before)).await?;
        println!("Purged {deleted} cancelled reservation(s) dated before {before}");
        return Ok(());
    }

    // ── Start server ───────────────────────────────────────────
    let handle = ServerHandle::start(ServerOptions {
        config,
        auto_migrate: !cli.no_migrate,
        create_default_admin: !cli.no_admin,
    })
    .await?;

    handle.install_signal_handler();

    info!("Press Ctrl+C to shutdown gracefully.");

    handle.shutdown_signal().wait().await;
    handle.wait().await;

    Ok(())
}
