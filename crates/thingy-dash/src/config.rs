//! Configuration file management.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thingy_core::ScanOptions;
use tracing::warn;

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Default device name or address
    #[serde(default)]
    pub device: Option<String>,

    /// How long to scan for a device, in seconds
    #[serde(default = "default_scan_timeout")]
    pub scan_timeout: u64,

    /// Behavior settings
    #[serde(default)]
    pub behavior: BehaviorConfig,

    /// GUI-specific settings
    #[serde(default)]
    pub gui: GuiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: None,
            scan_timeout: default_scan_timeout(),
            behavior: BehaviorConfig::default(),
            gui: GuiConfig::default(),
        }
    }
}

/// GUI-specific configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuiConfig {
    /// Theme preference: "dark" or "light"
    #[serde(default = "default_theme")]
    pub theme: String,

    /// Initial window width.
    #[serde(default)]
    pub window_width: Option<f32>,

    /// Initial window height.
    #[serde(default)]
    pub window_height: Option<f32>,

    /// Seconds of history visible on the temperature chart.
    #[serde(default = "default_chart_window")]
    pub chart_window_secs: u64,
}

fn default_theme() -> String {
    "dark".to_string()
}

fn default_chart_window() -> u64 {
    30
}

fn default_scan_timeout() -> u64 {
    10
}

impl Default for GuiConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            window_width: None,
            window_height: None,
            chart_window_secs: default_chart_window(),
        }
    }
}

impl GuiConfig {
    /// Chart window as a duration (at least one second).
    pub fn chart_window(&self) -> Duration {
        Duration::from_secs(self.chart_window_secs.max(1))
    }
}

/// Behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorConfig {
    /// Start streaming on every panel at startup
    #[serde(default = "default_true")]
    pub auto_connect: bool,
}

fn default_true() -> bool {
    true
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self { auto_connect: true }
    }
}

impl Config {
    /// Get the default config file path
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("thingy-dash")
            .join("config.toml")
    }

    /// Load config from the default path, or return default if not found
    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    /// Load config from a file, or return default if it is missing or invalid
    pub fn load_from(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        warn!("Failed to parse config {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    warn!("Failed to read config {}: {}", path.display(), e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path())
    }

    /// Save config to a file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Scan options for a backend, applying CLI overrides over the file.
    ///
    /// `device` already carries the `THINGY_DEVICE` fallback from clap.
    pub fn scan_options(&self, device: Option<String>, scan_timeout: Option<u64>) -> ScanOptions {
        let options = ScanOptions::new().duration_secs(resolve_scan_timeout(scan_timeout, self));
        match resolve_device(device, self) {
            Some(identifier) => options.identifier(identifier),
            None => options,
        }
    }
}

/// Resolve device from arg (or env var), then config.
pub fn resolve_device(device: Option<String>, config: &Config) -> Option<String> {
    device
        .filter(|d| !d.trim().is_empty())
        .or_else(|| config.device.clone())
}

/// Resolve scan timeout: use provided value, fall back to config.
pub fn resolve_scan_timeout(scan_timeout: Option<u64>, config: &Config) -> u64 {
    scan_timeout.unwrap_or(config.scan_timeout)
}
