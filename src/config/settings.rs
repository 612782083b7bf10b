//! Application settings and paths.
//!
//! Settings live in a JSON file under the platform config directory. Every
//! field has a default, so a missing file or missing keys are not errors.

use crate::cli::OutputFormat;
use crate::encoder::{EncodeRequest, ErrorCorrection};
use crate::error::{ConfigError, ConfigResult};
use crate::scanner::{CameraFacing, PipelineConfig, ScanMode, ScanOptions, SessionConfig, Template};
use crate::types::Color;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Application directory paths.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/qrscan on Linux)
    pub config_dir: PathBuf,
}

impl Paths {
    /// Resolve the platform directories.
    pub fn discover() -> ConfigResult<Self> {
        let project = ProjectDirs::from("com", "qrscan", "qrscan").ok_or(ConfigError::DirectoryNotFound)?;
        Ok(Self {
            config_dir: project.config_dir().to_path_buf(),
        })
    }

    /// Path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }
}

/// Application-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Default generated image size in pixels.
    pub default_size_px: u32,
    /// Default dark module color.
    pub default_foreground: String,
    /// Default light module color.
    pub default_background: String,
    /// Default error-correction level.
    pub default_error_correction: ErrorCorrection,
    /// Repeat-suppression window for continuous scans, in milliseconds.
    pub debounce_window_ms: u64,
    /// Maximum frame decodes per second, 0 for unlimited.
    pub max_decode_rate: u32,
    /// Camera to open.
    pub camera_facing: CameraFacing,
    /// Overlay template for QR scans.
    pub default_template: Template,
    /// Signal each delivered detection.
    pub vibrate_on_detect: bool,
    /// Offer the flashlight control.
    pub flashlight_enabled: bool,
    /// Default output format for scan results.
    pub default_output_format: OutputFormat,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            default_size_px: EncodeRequest::DEFAULT_SIZE_PX,
            default_foreground: "#000000".to_string(),
            default_background: "#FFFFFF".to_string(),
            default_error_correction: ErrorCorrection::M,
            debounce_window_ms: 2000,
            max_decode_rate: 0,
            camera_facing: CameraFacing::Back,
            default_template: Template::Simple,
            vibrate_on_detect: true,
            flashlight_enabled: true,
            default_output_format: OutputFormat::Plain,
        }
    }
}

impl AppSettings {
    /// Load settings from the default location, or defaults if there is no file.
    pub fn load() -> ConfigResult<Self> {
        let file = Paths::discover()?.settings_file();
        if !file.exists() {
            debug!(path = %file.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&file)
    }

    /// Load and validate settings from a specific file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let settings: Self =
            serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
        settings.validate()?;
        debug!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    /// Save settings to the default location.
    pub fn save(&self) -> ConfigResult<()> {
        let paths = Paths::discover()?;
        fs::create_dir_all(&paths.config_dir)?;
        self.save_to(&paths.settings_file())
    }

    /// Save settings to a specific file.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        self.validate()?;
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| ConfigError::WriteFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Reject values the encoder or scanner would refuse later.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.default_size_px == 0 {
            return Err(ConfigError::InvalidValue("default_size_px must be positive".to_string()));
        }
        for (key, value) in [
            ("default_foreground", &self.default_foreground),
            ("default_background", &self.default_background),
        ] {
            value
                .parse::<Color>()
                .map_err(|e| ConfigError::InvalidValue(format!("{}: {}", key, e)))?;
        }
        if i64::try_from(self.debounce_window_ms).is_err() {
            return Err(ConfigError::InvalidValue("debounce_window_ms is out of range".to_string()));
        }
        Ok(())
    }

    /// Encode request for `data` with the configured defaults.
    pub fn encode_request(&self, data: impl Into<String>) -> EncodeRequest {
        EncodeRequest::new(data)
            .with_size(self.default_size_px)
            .with_foreground(self.default_foreground.clone())
            .with_background(self.default_background.clone())
            .with_error_correction(self.default_error_correction)
    }

    /// Scan options for `mode` with the configured defaults.
    pub fn scan_options(&self, mode: ScanMode) -> ScanOptions {
        ScanOptions::new(mode)
            .with_template(self.default_template)
            .with_camera(self.camera_facing)
            .with_flashlight(self.flashlight_enabled)
            .with_vibration(self.vibrate_on_detect)
    }

    /// Session tuning from the configured window and decode rate.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            debounce_window: chrono::Duration::milliseconds(self.debounce_window_ms as i64),
            pipeline: PipelineConfig {
                max_decode_rate: self.max_decode_rate,
            },
        }
    }
}
