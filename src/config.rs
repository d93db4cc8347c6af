//! Configuration module
//!
//! TOML file based configuration for the allocation daemon. Every section
//! has defaults, so a missing file or a partial one still yields a runnable
//! setup.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level application configuration, loaded from
/// `~/.config/allocation-service/config.toml` unless overridden.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub sweeper: SweeperSection,
    #[serde(default)]
    pub allocation: AllocationSection,
    #[serde(default)]
    pub metrics: MetricsSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseSection {
    /// Full connection URL. Takes precedence over `path` when set.
    pub url: Option<String>,
    /// SQLite file path, turned into a `sqlite://` URL.
    pub path: Option<String>,
}

impl DatabaseSection {
    pub fn connection_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        match &self.path {
            Some(path) => format!("sqlite://{}?mode=rwc", path),
            None => "sqlite://./allocation.db?mode=rwc".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Tracing filter, e.g. "info" or "kitrent_allocation=debug,sea_orm=warn".
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SweeperSection {
    pub enabled: bool,
    /// Seconds between expiry passes.
    pub check_interval_secs: u64,
}

impl Default for SweeperSection {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AllocationSection {
    /// Minutes an intake hold stays fresh before the sweeper may take it.
    pub review_window_minutes: i64,
    /// Minutes granted when staff pick an order up for review.
    pub review_extension_minutes: i64,
    /// Attempts per order line when a hold or bind loses a race.
    pub bind_attempts: u32,
}

impl Default for AllocationSection {
    fn default() -> Self {
        Self {
            review_window_minutes: 120,
            review_extension_minutes: 1440,
            bind_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsSection {
    pub enabled: bool,
    /// Prometheus scrape endpoint, host:port.
    pub listen: String,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: "127.0.0.1:9464".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let raw = std::fs::read_to_string(path)?;
        let cfg = toml::from_str(&raw)?;
        Ok(cfg)
    }
}

/// Default config file location: `~/.config/allocation-service/config.toml`.
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("allocation-service")
        .join("config.toml")
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg: AppConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.sweeper.enabled);
        assert_eq!(cfg.sweeper.check_interval_secs, 60);
        assert_eq!(cfg.allocation.review_window_minutes, 120);
        assert_eq!(cfg.allocation.bind_attempts, 3);
        assert!(!cfg.metrics.enabled);
        assert_eq!(cfg.database.connection_url(), "sqlite://./allocation.db?mode=rwc");
    }

    #[test]
    fn partial_file_overrides_only_named_keys() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [database]
            path = "/var/lib/kitrent/allocation.db"

            [sweeper]
            check_interval_secs = 15

            [allocation]
            review_window_minutes = 30

            [metrics]
            enabled = true
            "#,
        )
        .unwrap();

        assert_eq!(
            cfg.database.connection_url(),
            "sqlite:///var/lib/kitrent/allocation.db?mode=rwc"
        );
        assert_eq!(cfg.sweeper.check_interval_secs, 15);
        assert!(cfg.sweeper.enabled, "unset key keeps its default");
        assert_eq!(cfg.allocation.review_window_minutes, 30);
        assert_eq!(
            cfg.allocation.bind_attempts, 3,
            "unset key keeps its default"
        );
        assert!(cfg.metrics.enabled);
        assert_eq!(cfg.metrics.listen, "127.0.0.1:9464");
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn explicit_url_beats_path() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [database]
            url = "sqlite::memory:"
            path = "/ignored.db"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.database.connection_url(), "sqlite::memory:");
    }
}
