//! Configuration management for dbwin-monitor.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use crate::cli::{Args, ConfigFormat, RetentionArg};
use anyhow::{bail, Context};
use dbwin_monitor::retention::RetentionMode;
use dbwin_monitor::ringbuffer::DEFAULT_CAPACITY;
use dbwin_monitor::settings::DEFAULT_SETTINGS_FILE;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

// Default configuration constants
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 100;
pub const DEFAULT_BATCH_SIZE: usize = 256;
pub const DEFAULT_RETENTION_LIMIT: usize = 10_000;
pub const DEFAULT_PRUNE_INTERVAL_SECS: u64 = 60;

/// Retention policy as written in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    None,
    AutoClear,
    KeepMax,
}

impl From<RetentionArg> for RetentionPolicy {
    fn from(arg: RetentionArg) -> Self {
        match arg {
            RetentionArg::None => RetentionPolicy::None,
            RetentionArg::AutoClear => RetentionPolicy::AutoClear,
            RetentionArg::KeepMax => RetentionPolicy::KeepMax,
        }
    }
}

/// Effective configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    // Store
    pub capacity: Option<usize>,

    // Capture
    pub capture_local: Option<bool>,
    pub capture_global: Option<bool>,
    #[serde(alias = "wait-timeout-ms")]
    pub wait_timeout_ms: Option<u64>,
    #[serde(alias = "batch-size")]
    pub batch_size: Option<usize>,

    // Retention
    pub retention: Option<RetentionPolicy>,
    #[serde(alias = "retention-limit")]
    pub retention_limit: Option<usize>,
    #[serde(alias = "prune-interval-secs")]
    pub prune_interval_secs: Option<u64>,

    // Filter settings
    #[serde(alias = "settings-file")]
    pub settings_file: Option<PathBuf>,

    // Output
    pub log_level: Option<String>,
    pub show_pid: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capacity: Some(DEFAULT_CAPACITY),
            capture_local: Some(true),
            capture_global: Some(false),
            wait_timeout_ms: Some(DEFAULT_WAIT_TIMEOUT_MS),
            batch_size: Some(DEFAULT_BATCH_SIZE),
            retention: Some(RetentionPolicy::KeepMax),
            retention_limit: Some(DEFAULT_RETENTION_LIMIT),
            prune_interval_secs: Some(DEFAULT_PRUNE_INTERVAL_SECS),
            settings_file: Some(PathBuf::from(DEFAULT_SETTINGS_FILE)),
            log_level: Some("warn".into()),
            show_pid: Some(true),
        }
    }
}

impl Config {
    pub fn capacity(&self) -> usize {
        self.capacity.unwrap_or(DEFAULT_CAPACITY)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms.unwrap_or(DEFAULT_WAIT_TIMEOUT_MS))
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE)
    }

    pub fn prune_interval(&self) -> Duration {
        Duration::from_secs(self.prune_interval_secs.unwrap_or(DEFAULT_PRUNE_INTERVAL_SECS))
    }

    pub fn settings_file(&self) -> PathBuf {
        self.settings_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE))
    }

    pub fn retention_mode(&self) -> RetentionMode {
        let limit = self.retention_limit.unwrap_or(DEFAULT_RETENTION_LIMIT);
        match self.retention.unwrap_or(RetentionPolicy::KeepMax) {
            RetentionPolicy::None => RetentionMode::None,
            RetentionPolicy::AutoClear => RetentionMode::AutoClear(limit),
            RetentionPolicy::KeepMax => RetentionMode::KeepMax(limit),
        }
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> anyhow::Result<()> {
    if cfg.capacity() == 0 {
        bail!("capacity must be greater than 0");
    }
    if cfg.batch_size() == 0 {
        bail!("batch_size must be greater than 0");
    }
    if cfg.wait_timeout_ms == Some(0) {
        bail!("wait_timeout_ms must be greater than 0");
    }
    if let Some(level) = cfg.log_level.as_deref() {
        if !matches!(level, "off" | "error" | "warn" | "info" | "debug" | "trace") {
            bail!(
                "Invalid log_level '{}', expected off, error, warn, info, debug or trace",
                level
            );
        }
    }

    let local = cfg.capture_local.unwrap_or(true);
    let global = cfg.capture_global.unwrap_or(false);
    if !(local || global) {
        bail!("At least one of capture_local/capture_global must be true");
    }

    if let Some(limit) = cfg.retention_mode().limit() {
        if limit == 0 {
            bail!("retention_limit must be greater than 0 when retention is enabled");
        }
        if limit > cfg.capacity() {
            bail!(
                "retention_limit ({}) exceeds capacity ({})",
                limit,
                cfg.capacity()
            );
        }
    }

    Ok(())
}

/// The `--config` path when it was given but does not exist.
pub fn missing_config_file(args: &Args) -> Option<&Path> {
    if args.no_config {
        return None;
    }
    args.config.as_deref().filter(|path| !path.exists())
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(capacity) = args.capacity {
        config.capacity = Some(capacity);
    }
    if args.global {
        config.capture_global = Some(true);
    }
    if args.no_local {
        config.capture_local = Some(false);
    }
    if let Some(ms) = args.wait_timeout_ms {
        config.wait_timeout_ms = Some(ms);
    }
    if let Some(size) = args.batch_size {
        config.batch_size = Some(size);
    }
    if let Some(retention) = args.retention {
        config.retention = Some(retention.into());
    }
    if let Some(limit) = args.retention_limit {
        config.retention_limit = Some(limit);
    }
    if let Some(path) = &args.settings_file {
        config.settings_file = Some(path.clone());
    }
    if let Some(level) = &args.log_level {
        config.log_level = Some(level.as_str().to_string());
    }
    if args.hide_pid {
        config.show_pid = Some(false);
    }

    Ok(config)
}

/// Loads the config file, searching default locations when no path is given.
/// A missing file yields the defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let defaults = [
                "./dbwin-monitor.yaml",
                "./dbwin-monitor.yml",
                "./dbwin-monitor.json",
            ];

            match defaults.iter().find(|p| Path::new(p).exists()) {
                Some(found) => PathBuf::from(found),
                None => return Ok(Config::default()),
            }
        }
    };

    // Reported by the caller through `missing_config_file` once logging is up
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;

    let config: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&content)
            .with_context(|| format!("invalid JSON in {}", path.display()))?,
        Some("toml") => toml::from_str(&content)
            .with_context(|| format!("invalid TOML in {}", path.display()))?,
        // Default to YAML
        _ => serde_yaml::from_str(&content)
            .with_context(|| format!("invalid YAML in {}", path.display()))?,
    };

    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}

/// Renders configuration in the requested format.
pub fn render_config(config: &Config, format: &ConfigFormat) -> anyhow::Result<String> {
    Ok(match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    })
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: &ConfigFormat) -> anyhow::Result<()> {
    println!("{}", render_config(config, format)?);
    Ok(())
}
