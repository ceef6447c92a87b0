//! Configuration loading from TOML files.
//!
//! Lookup order:
//! 1. `$AUTOCHECK_CONFIG` environment variable
//! 2. `~/.config/autocheck/config.toml`
//! 3. Built-in defaults (everything is optional)

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use autocheck_core::SessionSettings;
use autocheck_tracker::{RetryPolicy, TrackingSettings};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub tracking: TrackingConfig,
    pub feedback: FeedbackConfig,
    pub tolerance: ToleranceConfig,
}

/// Telemetry sidecar settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub enabled: bool,
    /// Base URL; events go to `{url}/hologram/{session id}`.
    pub url: String,
    /// Events held before new ones are dropped.
    pub queue_capacity: usize,
    pub timeout_ms: u64,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    /// Distinct wrong answers before the expected one may be shown.
    pub reveal_after: usize,
    pub show_answer: bool,
}

/// Default tolerances for numeric checks.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ToleranceConfig {
    pub absolute: f64,
    pub relative: f64,
}

// --- Defaults ---

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: "http://127.0.0.1:5000".into(),
            queue_capacity: 64,
            timeout_ms: 5000,
            max_attempts: 3,
            initial_backoff_ms: 200,
            max_backoff_ms: 2000,
        }
    }
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            reveal_after: 2,
            show_answer: false,
        }
    }
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            absolute: 0.0,
            relative: 1e-6,
        }
    }
}

// --- Conversions ---

impl TrackingConfig {
    pub fn settings(&self) -> TrackingSettings {
        TrackingSettings {
            url: self.url.clone(),
            queue_capacity: self.queue_capacity,
            timeout: Duration::from_millis(self.timeout_ms),
            retry: RetryPolicy {
                max_attempts: self.max_attempts,
                initial_backoff: Duration::from_millis(self.initial_backoff_ms),
                max_backoff: Duration::from_millis(self.max_backoff_ms),
            },
        }
    }
}

impl Config {
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            reveal_after: self.feedback.reveal_after,
            show_answer: self.feedback.show_answer,
            absolute_tolerance: self.tolerance.absolute,
            relative_tolerance: self.tolerance.relative,
        }
    }
}

/// Load config from disk. Returns defaults if no config file exists.
pub fn load_config() -> Result<Config> {
    match config_path() {
        Some(p) if p.exists() => load_from(&p),
        _ => Ok(Config::default()),
    }
}

pub fn load_from(path: &Path) -> Result<Config> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

/// Resolve the config file path.
fn config_path() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("AUTOCHECK_CONFIG") {
        return Some(PathBuf::from(p));
    }
    directories::BaseDirs::new().map(|dirs| {
        dirs.home_dir()
            .join(".config")
            .join("autocheck")
            .join("config.toml")
    })
}

/// Show the active config path (for `autocheck config`).
pub fn show_config_path() -> String {
    match config_path() {
        Some(p) if p.exists() => format!("{} (loaded)", p.display()),
        Some(p) => format!("{} (not found, using defaults)", p.display()),
        None => "no config path resolved (using defaults)".into(),
    }
}
