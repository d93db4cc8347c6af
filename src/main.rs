//! Allocation daemon entry point
//!
//! Reads configuration from TOML file (~/.config/allocation-service/config.toml),
//! connects to the database, runs migrations and keeps the expiry sweeper
//! running until SIGTERM/SIGINT.

use std::sync::Arc;

use tracing::{error, info, warn};

use kitrent_allocation::config::AppConfig;
use kitrent_allocation::domain::RepositoryProvider;
use kitrent_allocation::shared::shutdown::ShutdownCoordinator;
use kitrent_allocation::{
    default_config_path, init_database, start_expiry_sweeper_task, DatabaseConfig, Migrator,
    SeaOrmRepositoryProvider,
};

use sea_orm_migration::MigratorTrait;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Load configuration ─────────────────────────────────────
    let config_path = std::env::var("ALLOCATION_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| default_config_path());
    let app_cfg = match AppConfig::load(&config_path) {
        Ok(cfg) => {
            // Initialize logging with configured level
            tracing_subscriber::fmt()
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cfg.logging.level)),
                )
                .init();
            info!("Configuration loaded from {}", config_path.display());
            cfg
        }
        Err(e) => {
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
                .init();
            error!("Failed to load config: {}. Using defaults.", e);
            AppConfig::default()
        }
    };

    info!("Starting Kitrent allocation engine...");

    // ── Prometheus metrics exporter ────────────────────────────
    if app_cfg.metrics.enabled {
        match app_cfg.metrics.listen.parse::<std::net::SocketAddr>() {
            Ok(addr) => {
                metrics_exporter_prometheus::PrometheusBuilder::new()
                    .with_http_listener(addr)
                    .install()
                    .expect("Failed to install Prometheus metrics exporter");
                info!("📊 Prometheus metrics exporter listening on {}", addr);
            }
            Err(e) => {
                error!(
                    "Invalid metrics listen address '{}': {}. Metrics disabled.",
                    app_cfg.metrics.listen, e
                );
            }
        }
    }

    // ── Database ───────────────────────────────────────────────
    let db_config = DatabaseConfig {
        url: app_cfg.database.connection_url(),
    };
    info!("Database: {}", db_config.url);

    let db = match init_database(&db_config).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return Err(e.into());
        }
    };

    info!("Running database migrations...");
    if let Err(e) = Migrator::up(&db, None).await {
        error!("Failed to run migrations: {}", e);
        return Err(e.into());
    }
    info!("Migrations completed");

    let repos: Arc<dyn RepositoryProvider> = Arc::new(SeaOrmRepositoryProvider::new(db.clone()));

    // ── Shutdown coordination ──────────────────────────────────
    let shutdown = ShutdownCoordinator::new();
    shutdown.start_signal_listener();

    // ── Expiry sweeper ─────────────────────────────────────────
    if app_cfg.sweeper.enabled {
        start_expiry_sweeper_task(
            repos.clone(),
            shutdown.signal(),
            app_cfg.sweeper.check_interval_secs,
        );
    } else {
        warn!("Expiry sweeper disabled by configuration; lapsed holds will not be flipped");
    }

    info!("🚀 Allocation engine running. Press Ctrl+C to shutdown gracefully.");

    shutdown.wait_for_shutdown().await;

    // Perform final cleanup
    info!("🧹 Performing final cleanup...");

    if let Err(e) = db.close().await {
        warn!("Error closing database connection: {}", e);
    } else {
        info!("✅ Database connection closed");
    }

    info!("👋 Kitrent allocation engine shutdown complete");
    Ok(())
}
