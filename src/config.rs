use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::icon::IconStyle;

/// Contents of `~/.wavebar.toml`; missing sections fall back to defaults
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// `[icon]` animation settings
    pub icon: IconConfig,
    /// `[meter]` level source
    pub meter: MeterConfig,
    /// `[surface]` where frames go
    pub surface: SurfaceConfig,
    /// `[telemetry]` logging
    pub telemetry: TelemetryConfig,
}

/// Animation timing and look
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct IconConfig {
    /// Animation tick period
    pub tick_interval_ms: u64,
    /// Phase advance per tick
    pub phase_step: f64,
    /// Opacity of the idle icon
    pub idle_opacity: f64,
}

impl Default for IconConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 50,
            phase_step: 0.15,
            idle_opacity: 0.7,
        }
    }
}

impl IconConfig {
    /// Tick period, at least 1 ms
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    /// Renderer style with these settings applied
    #[must_use]
    pub fn style(&self) -> IconStyle {
        IconStyle {
            phase_step: self.phase_step,
            idle_opacity: self.idle_opacity,
            ..IconStyle::default()
        }
    }
}

/// Where meter readings come from
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MeterSourceKind {
    /// Default input device
    #[default]
    Microphone,
    /// WAV file replayed in real time
    Wav,
    /// Generated speech-like envelope
    Synthetic,
}

/// Meter source selection
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct MeterConfig {
    /// Which source to start
    pub source: MeterSourceKind,
    /// Required when `source = "wav"`
    pub wav_path: Option<String>,
    /// Reading period for wav and synthetic sources
    pub interval_ms: u64,
    /// Capacity of the icon event queue
    pub queue_capacity: usize,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            source: MeterSourceKind::Microphone,
            wav_path: None,
            interval_ms: 50,
            queue_capacity: 64,
        }
    }
}

/// Where rendered frames are shown
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceKind {
    /// System tray / menu bar
    #[default]
    Tray,
    /// PNG files on disk
    Png,
}

/// Frame output
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct SurfaceConfig {
    /// Surface to present on
    pub kind: SurfaceKind,
    /// Output directory for the png surface
    pub png_dir: String,
    /// Write every n-th frame
    pub png_every: u64,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            kind: SurfaceKind::Tray,
            png_dir: "~/.wavebar/frames".to_owned(),
            png_every: 20,
        }
    }
}

/// Logging destination
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Append logs to `log_path` instead of stdout
    pub enabled: bool,
    /// Log file, `~/` expanded
    pub log_path: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_path: "~/.wavebar/wavebar.log".to_owned(),
        }
    }
}

const DEFAULT_CONFIG: &str = r#"[icon]
tick_interval_ms = 50
phase_step = 0.15
idle_opacity = 0.7

[meter]
# microphone | wav | synthetic
source = "microphone"
# wav_path = "~/clip.wav"
interval_ms = 50
queue_capacity = 64

[surface]
# tray | png
kind = "tray"
png_dir = "~/.wavebar/frames"
png_every = 20

[telemetry]
enabled = false
log_path = "~/.wavebar/wavebar.log"
"#;

impl Config {
    /// Load config from ~/.wavebar.toml, writing the default file first if missing
    ///
    /// # Errors
    /// Returns error if HOME is unset, or the file cannot be written, read or parsed
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default(&config_path).context("failed to create default config")?;
        }

        Self::load_from(&config_path)
    }

    /// Load config from an explicit path
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&contents)
    }

    /// Parse config from TOML text
    ///
    /// # Errors
    /// Returns error if the TOML is malformed or has wrongly typed values
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("failed to parse config TOML")
    }

    fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME").context("HOME environment variable not set")?;
        Ok(PathBuf::from(home).join(".wavebar.toml"))
    }

    fn create_default(path: &Path) -> Result<()> {
        fs::write(path, DEFAULT_CONFIG).context("failed to write default config")?;
        Ok(())
    }

    /// Expand ~ in paths to home directory
    ///
    /// # Errors
    /// Returns error if the path starts with `~/` and HOME is unset
    pub fn expand_path(path: &str) -> Result<PathBuf> {
        if let Some(stripped) = path.strip_prefix("~/") {
            let home = std::env::var("HOME").context("HOME environment variable not set")?;
            Ok(PathBuf::from(home).join(stripped))
        } else {
            Ok(PathBuf::from(path))
        }
    }
}
