// ============================
// backend-lib/src/config.rs
// ============================
//! Configuration management.
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "pokerboard.toml";

/// Prefix of environment overrides, e.g. `POKERBOARD_BIND_ADDR`
pub const ENV_PREFIX: &str = "POKERBOARD_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Log level, overridden by `RUST_LOG` when set
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
    /// Bound of each board actor's inbox; a full inbox rejects commands
    pub command_queue_capacity: usize,
    /// Bound of each connection's outbound queue
    pub subscriber_buffer: usize,
    /// Longest accepted participant name, in characters
    pub max_name_len: usize,
    /// How often each connection is pinged
    pub heartbeat_interval_ms: u64,
    /// A connection silent for this long is treated as lost
    pub idle_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            command_queue_capacity: 64,
            subscriber_buffer: 32,
            max_name_len: 64,
            heartbeat_interval_ms: 10_000,
            idle_timeout_ms: 30_000,
        }
    }
}

impl Settings {
    /// Layered sources: defaults, then the TOML file, then the environment
    pub fn figment(path: impl AsRef<Path>) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    /// Load settings from `pokerboard.toml` and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load settings from a specific file and the environment
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let settings: Settings = Self::figment(path).extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            bail!(
                "invalid log level {:?}, expected one of {LOG_LEVELS:?}",
                self.log_level
            );
        }
        if self.command_queue_capacity == 0 {
            bail!("command_queue_capacity must be greater than zero");
        }
        if self.subscriber_buffer == 0 {
            bail!("subscriber_buffer must be greater than zero");
        }
        if self.max_name_len == 0 {
            bail!("max_name_len must be greater than zero");
        }
        if self.heartbeat_interval_ms == 0 {
            bail!("heartbeat_interval_ms must be greater than zero");
        }
        if self.idle_timeout_ms <= self.heartbeat_interval_ms {
            bail!("idle_timeout_ms must be longer than heartbeat_interval_ms");
        }
        Ok(())
    }
}
