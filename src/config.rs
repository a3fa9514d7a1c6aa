//! Runtime constants and the TOML configuration file.
//!
//! Tunable defaults are collected here so they can be found and adjusted in a
//! single place rather than scattered across modules.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::AppError;

/// Bytes in one billed gigabyte (binary, 2^30).
pub const BYTES_PER_GB: f64 = (1u64 << 30) as f64;

/// Container ids are shortened to this many characters in log lines.
pub const SHORT_ID_LEN: usize = 12;

/// Config file used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "./config.toml";

/// Upper bound on a single container runtime command (seconds).
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;

/// How long SQLite waits on a locked database before failing (milliseconds).
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Loopback is never counted as egress.
pub const LOOPBACK_INTERFACE: &str = "lo";

/// Top-level configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// `[database]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Path of the SQLite tenant database.
    pub path: PathBuf,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

/// `[runtime]` section describing how to reach the container runtime.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    pub docker_bin: String,
    pub proc_root: PathBuf,
    pub command_timeout_secs: u64,
    /// Interfaces counted as egress. Empty means every non-loopback interface.
    pub interfaces: Vec<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            docker_bin: "docker".to_string(),
            proc_root: PathBuf::from("/proc"),
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            interfaces: Vec::new(),
        }
    }
}

fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

impl Config {
    /// Read and validate the configuration file at `path`.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            return Err(AppError::Configuration(format!(
                "config file {} does not exist",
                path.display()
            )));
        }
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::Configuration(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::parse(&raw)
    }

    /// Parse and validate configuration from TOML text.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let config: Config = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.database.path.as_os_str().is_empty() {
            return Err(AppError::Configuration("database.path must not be empty".into()));
        }
        if self.runtime.command_timeout_secs == 0 {
            return Err(AppError::Configuration(
                "runtime.command_timeout_secs must be positive".into(),
            ));
        }
        if self.runtime.docker_bin.trim().is_empty() {
            return Err(AppError::Configuration("runtime.docker_bin must not be empty".into()));
        }
        Ok(())
    }
}

/// Shorten a container id for log output.
pub fn short_id(service_id: &str) -> &str {
    match service_id.char_indices().nth(SHORT_ID_LEN) {
        Some((idx, _)) => &service_id[..idx],
        None => service_id,
    }
}
