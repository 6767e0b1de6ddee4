use std::time::Duration;

use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::notify::RetryConfig;

/// Main configuration structure for accessflow
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccessflowConfig {
    /// Notification delivery settings
    pub notifications: NotificationConfig,
    /// Database settings (optional)
    pub database: Option<DatabaseConfig>,
    /// Log level for the tracing subscriber
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationConfig {
    /// Maximum delivery attempts before marking the notification Failed
    pub max_attempts: u32,
    /// Initial backoff between attempts in milliseconds
    pub base_delay_ms: u64,
    /// Backoff ceiling in milliseconds
    pub max_delay_ms: u64,
    /// Add random jitter to backoff delays
    pub jitter: bool,
    /// Depth of the in-process intent queue
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL (SQLite file path or connection string)
    pub url: String,
    /// Maximum connections in pool
    pub max_connections: u32,
    /// Enable automatic migrations
    pub auto_migrate: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            jitter: true,
            queue_capacity: crate::notify::DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl Default for AccessflowConfig {
    fn default() -> Self {
        Self {
            notifications: NotificationConfig::default(),
            database: None,
            log_level: "info".to_string(),
        }
    }
}

impl AccessflowConfig {
    /// Load configuration from `accessflow.toml` (if present) layered with
    /// `ACCESSFLOW_`-prefixed environment variables.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("accessflow.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let defaults = AccessflowConfig::default();
        let settings = Config::builder()
            .set_default(
                "notifications.max_attempts",
                u64::from(defaults.notifications.max_attempts),
            )?
            .set_default(
                "notifications.base_delay_ms",
                defaults.notifications.base_delay_ms,
            )?
            .set_default(
                "notifications.max_delay_ms",
                defaults.notifications.max_delay_ms,
            )?
            .set_default("notifications.jitter", defaults.notifications.jitter)?
            .set_default(
                "notifications.queue_capacity",
                defaults.notifications.queue_capacity as u64,
            )?
            .set_default("log_level", defaults.log_level)?
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix("ACCESSFLOW").separator("__"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

impl NotificationConfig {
    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            jitter: self.jitter,
        }
    }
}
