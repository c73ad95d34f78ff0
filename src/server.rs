//! Reusable server runtime.
//!
//! [`ServerHandle`] owns the full lifecycle: metrics recorder, database and
//! migrations, default admin, REST API, and graceful shutdown. The CLI binary
//! and the plain `main` binary both start the service through it.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use chrono::NaiveDate;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tracing::{error, info, warn};

use crate::application::booking::{ReservationService, SystemClock};
use crate::application::identity::{NewAccount, UserService};
use crate::config::AppConfig;
use crate::domain::RepositoryProvider;
use crate::infrastructure::database::migrator::Migrator;
use crate::infrastructure::{init_database, SeaOrmRepositoryProvider};
use crate::interfaces::http::modules::metrics::describe_booking_metrics;
use crate::interfaces::http::{create_api_router, ApiDependencies};
use crate::shared::shutdown::{ShutdownCoordinator, ShutdownSignal};

pub type ServerError = Box<dyn std::error::Error + Send + Sync>;

// ── Options ────────────────────────────────────────────────────────

pub struct ServerOptions {
    pub config: AppConfig,
    /// Run database migrations on startup (default: true).
    pub auto_migrate: bool,
    /// Create the configured admin when no users exist (default: true).
    pub create_default_admin: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
            create_default_admin: true,
        }
    }
}

// ── ServerHandle ───────────────────────────────────────────────────

/// Handle to a running reservation service.
///
/// ```rust,no_run
/// use party_room::server::{ServerHandle, ServerOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), party_room::server::ServerError> {
///     let handle = ServerHandle::start(ServerOptions::default()).await?;
///     handle.install_signal_handler();
///     handle.shutdown_signal().wait().await;
///     handle.wait().await;
///     Ok(())
/// }
/// ```
pub struct ServerHandle {
    pub repos: Arc<dyn RepositoryProvider>,
    pub reservation_service: Arc<ReservationService>,
    pub user_service: Arc<UserService>,
    /// The configuration the server was started with.
    pub config: AppConfig,
    /// Address actually bound (resolves port 0).
    pub local_addr: SocketAddr,

    db: DatabaseConnection,
    shutdown: ShutdownCoordinator,
    api_task: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    /// Start the service.
    ///
    /// 1. Install the Prometheus recorder
    /// 2. Connect to the database and run migrations
    /// 3. Seed the default admin (if enabled)
    /// 4. Serve the REST API (with Swagger UI)
    pub async fn start(opts: ServerOptions) -> Result<Self, ServerError> {
        let app_cfg = opts.config;
        app_cfg.validate()?;

        info!("Starting party room reservation service...");

        let prometheus_handle = install_metrics_recorder();

        // ── Database ───────────────────────────────────────────
        let db = connect(&app_cfg, opts.auto_migrate).await?;

        // ── Repositories & Services ────────────────────────────
        let repos: Arc<dyn RepositoryProvider> =
            Arc::new(SeaOrmRepositoryProvider::new(db.clone()));
        let (reservation_service, user_service) = build_services(&app_cfg, repos.clone());

        if opts.create_default_admin {
            seed_default_admin(&user_service, &app_cfg).await;
        }

        // ── REST API server ────────────────────────────────────
        let api_router = create_api_router(ApiDependencies {
            repos: repos.clone(),
            reservation_service: reservation_service.clone(),
            user_service: user_service.clone(),
            jwt_config: app_cfg.jwt_config(),
            metrics_handle: prometheus_handle,
            allowed_origins: app_cfg.cors.allowed_origins.clone(),
        });

        let shutdown = ShutdownCoordinator::new(app_cfg.server.shutdown_timeout);
        let shutdown_signal = shutdown.signal();

        let listener = tokio::net::TcpListener::bind(app_cfg.api_address()).await?;
        let local_addr = listener.local_addr()?;
        info!("REST API server listening on http://{}", local_addr);
        info!("Swagger UI available at http://{}/docs/", local_addr);

        let api_server = axum::serve(
            listener,
            api_router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            shutdown_signal.wait().await;
            info!("REST API server received shutdown signal");
        });

        let api_task = tokio::spawn(async move {
            if let Err(e) = api_server.await {
                error!("REST API server error: {}", e);
            }
        });

        Ok(Self {
            repos,
            reservation_service,
            user_service,
            config: app_cfg,
            local_addr,
            db,
            shutdown,
            api_task,
        })
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Install OS signal listeners (SIGTERM, SIGINT) that trigger shutdown.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    /// Send the shutdown signal without waiting.
    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for the API task to drain, bounded by `server.shutdown_timeout`,
    /// then close the pool.
    pub async fn wait(self) {
        info!("Waiting for in-flight requests to complete...");

        let grace = Duration::from_secs(self.shutdown.timeout_secs());
        let abort = self.api_task.abort_handle();
        match tokio::time::timeout(grace, self.api_task).await {
            Ok(Ok(())) => info!("REST API server stopped"),
            Ok(Err(e)) => error!("REST API server task panicked: {}", e),
            Err(_) => {
                warn!(timeout_secs = grace.as_secs(), "Shutdown grace period elapsed, aborting");
                abort.abort();
            }
        }

        if let Err(e) = self.db.close().await {
            warn!("Error closing database connection: {}", e);
        } else {
            info!("Database connection closed");
        }

        info!("Party room service shutdown complete");
    }

    /// Trigger shutdown and wait for completion.
    pub async fn shutdown(self) {
        info!("Shutting down...");
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished()
    }
}

// ── One-shot maintenance ───────────────────────────────────────────

/// Delete cancelled reservations dated before `before` (default: today)
/// and return how many were removed. Does not start the HTTP server.
pub async fn run_purge(config: &AppConfig, before: Option<NaiveDate>) -> Result<u64, ServerError> {
    config.validate()?;

    let db = connect(config, true).await?;
    let repos: Arc<dyn RepositoryProvider> = Arc::new(SeaOrmRepositoryProvider::new(db.clone()));
    let (reservations, _) = build_services(config, repos);

    let before = before.unwrap_or_else(|| reservations.today());
    let result = reservations.purge(before).await;

    if let Err(e) = db.close().await {
        warn!("Error closing database connection: {}", e);
    }

    Ok(result?)
}

// ── Helpers ────────────────────────────────────────────────────────

/// The global recorder can only be installed once per process; later calls
/// reuse the first handle. `None` if another recorder was already installed.
fn install_metrics_recorder() -> Option<PrometheusHandle> {
    static PROM_HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

    PROM_HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                describe_booking_metrics();
                info!("Prometheus metrics recorder installed");
                Some(handle)
            }
            Err(e) => {
                warn!("Prometheus recorder unavailable, /metrics disabled: {}", e);
                None
            }
        })
        .clone()
}

async fn connect(config: &AppConfig, migrate: bool) -> Result<DatabaseConnection, ServerError> {
    let db = init_database(&config.database_config()).await?;

    if migrate {
        info!("Running database migrations...");
        Migrator::up(&db, None).await?;
        info!("Migrations completed");
    }

    Ok(db)
}

fn build_services(
    config: &AppConfig,
    repos: Arc<dyn RepositoryProvider>,
) -> (Arc<ReservationService>, Arc<UserService>) {
    let policy = config.booking_policy();
    info!(
        open = policy.hours.open,
        close = policy.hours.close,
        cancelled_blocks_slot = config.booking.cancelled_blocks_slot,
        "Booking policy loaded"
    );

    let reservations = Arc::new(ReservationService::new(
        repos.clone(),
        Arc::new(SystemClock),
        policy,
    ));
    let users = Arc::new(UserService::new(repos, config.jwt_config()));
    (reservations, users)
}

async fn seed_default_admin(users: &UserService, config: &AppConfig) {
    let admin = &config.admin;
    let account = NewAccount {
        name: admin.name.clone(),
        email: admin.email.clone(),
        phone: admin.phone.clone(),
        unit: admin.unit,
        password: admin.password.clone(),
    };

    if let Err(e) = users.seed_admin(account).await {
        error!("Failed to create admin user: {}", e);
    }
}

/// Initialize tracing from the application config.
///
/// Call once at process startup, before [`ServerHandle::start`].
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    let result = match config.logging.format.to_lowercase().as_str() {
        "json" => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        _ => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init(),
    };

    if let Err(e) = result {
        eprintln!("tracing already initialized: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn test_config() -> AppConfig {
        let mut cfg = AppConfig::default();
        cfg.server.api_host = "127.0.0.1".into();
        cfg.server.api_port = 0;
        cfg.server.shutdown_timeout = 5;
        // one connection, so every query sees the same in-memory database
        cfg.database.url = "sqlite::memory:".into();
        cfg.database.max_connections = 1;
        cfg.admin.password = "admin-password".into();
        cfg
    }

    async fn http_get(addr: SocketAddr, path: &str) -> String {
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn starts_serves_and_shuts_down() {
        let handle = ServerHandle::start(ServerOptions {
            config: test_config(),
            ..Default::default()
        })
        .await
        .unwrap();
        assert!(handle.is_running());
        assert_ne!(handle.local_addr.port(), 0);

        let response = http_get(handle.local_addr, "/health").await;
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("\"database\""));

        // default admin was seeded
        let admin = handle
            .user_service
            .login("admin@party-room.local", "admin-password")
            .await
            .unwrap();
        assert!(admin.user.is_admin());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn rejects_invalid_config() {
        let mut cfg = test_config();
        cfg.booking.opening_hour = 23;
        let result = ServerHandle::start(ServerOptions {
            config: cfg,
            ..Default::default()
        })
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn purge_on_empty_database() {
        let deleted = run_purge(&test_config(), NaiveDate::from_ymd_opt(2030, 1, 1))
            .await
            .unwrap();
        assert_eq!(deleted, 0);
    }
}
