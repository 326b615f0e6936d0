//! Configuration loading and resolution
//!
//! Configuration is a single TOML file resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. `BIAMP_CONFIG` environment variable
//! 3. Platform config directory (`~/.config/biamp/config.toml`, then
//!    `/etc/biamp/config.toml` on Linux)
//! 4. Compiled defaults (fallback)
//!
//! A missing or partial file is not fatal: absent sections fall back to
//! compiled defaults with a warning, so a bare device still starts.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Audio output configuration.
///
/// Device names are matched against the platform's output device list;
/// `None` selects the default device for that band.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Output device for the bass band (None = default device)
    pub bass_device: Option<String>,
    /// Output device for the mid band (None = default device)
    pub mid_device: Option<String>,
}

/// Physical control configuration.
///
/// Lines are value-file paths (sysfs GPIO on the target hardware). Any
/// unset input line disables the control that reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlsConfig {
    /// Rotary encoder line A
    pub encoder_line_a: Option<PathBuf>,
    /// Rotary encoder line B
    pub encoder_line_b: Option<PathBuf>,
    /// Push-button line (idle-high, active-low)
    pub button_line: Option<PathBuf>,
    /// Party-mode indicator output
    pub party_led_line: Option<PathBuf>,
    /// Power relay output
    pub relay_line: Option<PathBuf>,

    /// Poll cadence for both the encoder and the button, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Inter-click timeout for multi-click gestures, in milliseconds
    #[serde(default = "default_click_timeout_ms")]
    pub click_timeout_ms: u64,

    /// Hold threshold for the power-toggle long press, in milliseconds
    #[serde(default = "default_long_press_ms")]
    pub long_press_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    10
}

fn default_click_timeout_ms() -> u64 {
    400
}

fn default_long_press_ms() -> u64 {
    3000
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            encoder_line_a: None,
            encoder_line_b: None,
            button_line: None,
            party_led_line: None,
            relay_line: None,
            poll_interval_ms: default_poll_interval_ms(),
            click_timeout_ms: default_click_timeout_ms(),
            long_press_ms: default_long_press_ms(),
        }
    }
}

/// Top-level sink configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SinkConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub controls: ControlsConfig,
}

impl SinkConfig {
    /// Resolve configuration following the priority order in the module
    /// docs.
    ///
    /// An explicitly named file (CLI or environment) that cannot be read
    /// or parsed is an error; an absent file at the platform default
    /// location only produces a warning and compiled defaults.
    pub fn resolve(cli_path: Option<&Path>) -> Result<Self> {
        // Priority 1: command-line argument
        if let Some(path) = cli_path {
            return Self::load_file(path);
        }

        // Priority 2: environment variable
        if let Ok(path) = std::env::var("BIAMP_CONFIG") {
            return Self::load_file(Path::new(&path));
        }

        // Priority 3: platform config directory
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                return Self::load_file(&path);
            }
        }

        // Priority 4: compiled defaults
        warn!("No configuration file found, using compiled defaults");
        Ok(Self::default())
    }

    /// Load and parse a specific config file.
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            Error::Config(format!("Cannot parse config file {}: {}", path.display(), e))
        })
    }

    /// Default configuration file path for the platform.
    ///
    /// Returns the user config path if the lookup succeeds, with
    /// `/etc/biamp/config.toml` as the system-wide fallback on Linux.
    pub fn default_config_path() -> Option<PathBuf> {
        let user_config = dirs::config_dir().map(|d| d.join("biamp").join("config.toml"));

        if let Some(path) = &user_config {
            if path.exists() {
                return user_config;
            }
        }

        if cfg!(target_os = "linux") {
            let system_config = PathBuf::from("/etc/biamp/config.toml");
            if system_config.exists() {
                return Some(system_config);
            }
        }

        user_config
    }
}
