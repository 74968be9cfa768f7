//! Configuration management for CrabClip
//!
//! Provides loading, saving and validation of capture defaults, recording
//! naming/output options and the monitoring sink settings.

use crate::errors::CaptureError;
use crate::types::{FacingMode, FrameRate, Orientation, Resolution};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrabClipConfig {
    pub capture: CaptureSettings,
    pub recording: RecordingSettings,
    pub monitoring: MonitoringConfig,
}

/// Camera request configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    /// Portrait requests swap width and height
    pub orientation: Orientation,
    pub facing_mode: FacingMode,
    /// Which enumerated video input to probe
    pub device_index: usize,
    /// Used until (or unless) a capability probe succeeds
    pub default_resolution: Option<Resolution>,
    pub default_frame_rate: Option<FrameRate>,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            orientation: Orientation::Landscape,
            facing_mode: FacingMode::Environment,
            device_index: 0,
            default_resolution: None,
            default_frame_rate: None,
        }
    }
}

/// Container preference; `Auto` picks by recorder support
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerPreference {
    #[default]
    Auto,
    Webm,
    Mp4,
}

/// Recording output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingSettings {
    pub container: ContainerPreference,
    /// Clips are named `<prefix>-<N>`
    pub name_prefix: String,
    /// Target directory for natively encoded clips
    pub output_directory: String,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self {
            container: ContainerPreference::Auto,
            name_prefix: "VideoRecord".to_string(),
            output_directory: "./recordings".to_string(),
        }
    }
}

/// Monitoring sink configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
    /// DSN key of the monitoring backend
    pub dsn: String,
    /// e.g. "production"
    pub environment: String,
    pub release: String,
    pub debug: bool,
    /// 0.0 sends no traces, 1.0 sends all
    pub traces_sample_rate: f64,
    /// Tags added to every transaction
    pub custom_tags: BTreeMap<String, String>,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            dsn: String::new(),
            environment: "development".to_string(),
            release: env!("CARGO_PKG_VERSION").to_string(),
            debug: false,
            traces_sample_rate: 1.0,
            custom_tags: BTreeMap::new(),
        }
    }
}

impl CrabClipConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CaptureError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| CaptureError::Config(format!("Failed to read config file: {}", e)))?;

        let config: CrabClipConfig = toml::from_str(&contents)
            .map_err(|e| CaptureError::Config(format!("Failed to parse config file: {}", e)))?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CaptureError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CaptureError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| CaptureError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| CaptureError::Config(format!("Failed to write config file: {}", e)))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        PathBuf::from("crabclip.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.recording.name_prefix.trim().is_empty() {
            return Err("Recording name prefix must not be empty".to_string());
        }
        if self.recording.output_directory.trim().is_empty() {
            return Err("Recording output directory must not be empty".to_string());
        }
        if !(0.0..=1.0).contains(&self.monitoring.traces_sample_rate) {
            return Err("Traces sample rate must be between 0.0 and 1.0".to_string());
        }
        if self.monitoring.enabled && self.monitoring.environment.trim().is_empty() {
            return Err("Monitoring environment must be set when monitoring is enabled".to_string());
        }
        Ok(())
    }
}
