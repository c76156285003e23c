//! Configuration management for camhal
//!
//! Holds the defaults a session advertises when the camera is opened: sensor
//! facing, preview and picture geometry, exposure compensation bounds and the
//! white-balance modes the sensor can be tuned to.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Direction the sensor faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    Back,
    Front,
}

impl Facing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Facing::Back => "back",
            Facing::Front => "front",
        }
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub camera: CameraConfig,
    pub picture: PictureConfig,
    pub exposure: ExposureConfig,
    pub white_balance: Vec<WhiteBalanceMode>,
}

/// Sensor and preview stream settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    pub facing: Facing,
    /// Mounting orientation in degrees
    pub orientation: u32,
    /// Default preview resolution [width, height]
    pub preview_size: [u32; 2],
    pub preview_format: String,
    /// Pixel format delivered to video recording
    pub video_format: String,
    /// Default preview frames per second
    pub preview_fps: u32,
    pub supported_fps: Vec<u32>,
    /// Advertised fps range [min, max]
    pub fps_range: [u32; 2],
    pub focal_length: f32,
    /// Horizontal and vertical view angles in degrees
    pub view_angles: [f32; 2],
}

/// Still picture settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PictureConfig {
    pub size: [u32; 2],
    pub format: String,
    /// JPEG quality (1-100), also used when the parameter set carries none
    pub jpeg_quality: u8,
    pub thumbnail_size: [u32; 2],
    pub thumbnail_quality: u8,
}

/// Exposure compensation bounds, in steps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExposureConfig {
    pub min: i32,
    pub max: i32,
    /// EV per step
    pub step: f32,
}

/// A white-balance mode and its device scale factors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhiteBalanceMode {
    pub mode: String,
    pub red_scale: f32,
    pub blue_scale: f32,
}

impl WhiteBalanceMode {
    pub fn new(mode: &str, red_scale: f32, blue_scale: f32) -> Self {
        Self {
            mode: mode.to_string(),
            red_scale,
            blue_scale,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                facing: Facing::Back,
                orientation: 0,
                preview_size: [640, 480],
                preview_format: "yuv420p".to_string(),
                video_format: "yuv420p".to_string(),
                preview_fps: 20,
                supported_fps: vec![30, 24, 20, 15, 10, 5],
                fps_range: [5, 30],
                focal_length: 4.31,
                view_angles: [54.8, 42.5],
            },
            picture: PictureConfig {
                size: [640, 480],
                format: "jpeg".to_string(),
                jpeg_quality: 90,
                thumbnail_size: [512, 384],
                thumbnail_quality: 90,
            },
            exposure: ExposureConfig {
                min: -6,
                max: 6,
                step: 0.5,
            },
            white_balance: vec![
                WhiteBalanceMode::new("auto", 1.0, 1.0),
                WhiteBalanceMode::new("incandescent", 1.38, 0.60),
                WhiteBalanceMode::new("daylight", 1.09, 0.92),
                WhiteBalanceMode::new("twilight", 0.92, 1.22),
            ],
        }
    }
}

impl SessionConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let config: SessionConfig = toml::from_str(&contents)?;
        config.validate()?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        fs::write(path, toml_string)?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("camhal.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        let [w, h] = self.camera.preview_size;
        if w == 0 || h == 0 || w % 2 != 0 || h % 2 != 0 {
            return invalid("preview size must be non-zero and even");
        }
        let [w, h] = self.picture.size;
        if w == 0 || h == 0 || w % 2 != 0 || h % 2 != 0 {
            return invalid("picture size must be non-zero and even");
        }
        if self.camera.preview_fps == 0 || self.camera.preview_fps > 240 {
            return invalid("preview fps must be 1-240");
        }
        if self.camera.fps_range[0] > self.camera.fps_range[1] {
            return invalid("fps range is inverted");
        }
        if self.picture.jpeg_quality == 0 || self.picture.jpeg_quality > 100 {
            return invalid("JPEG quality must be between 1 and 100");
        }
        if self.exposure.min > self.exposure.max {
            return invalid("exposure compensation min exceeds max");
        }
        if self.exposure.step <= 0.0 {
            return invalid("exposure compensation step must be positive");
        }
        if self.white_balance.is_empty() {
            return invalid("at least one white balance mode is required");
        }
        if self
            .white_balance
            .iter()
            .any(|wb| wb.mode.is_empty() || wb.mode.contains([',', '=', ';']))
        {
            return invalid("white balance mode names must be plain words");
        }
        Ok(())
    }
}
