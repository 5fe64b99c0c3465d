//! Application configuration management.
//!
//! This module handles the persistent configuration for tonedeck: the startup
//! volume, the analysis window size, the visualizer style and the keyboard
//! step sizes. Configuration is stored in the user's config directory
//! (typically ~/.config/tonedeck/config.toml). A missing file means defaults.

use crate::constants::{MAX_FFT_SIZE, MIN_FFT_SIZE};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

/// How the visualizer paints each frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualStyle {
    /// One waveform trace across the full width
    Linear,
    /// Up to three traces mirrored around the horizontal center
    Mirrored,
    /// One vertical bar per frequency bin
    Bars,
}

impl VisualStyle {
    pub fn next(self) -> Self {
        match self {
            VisualStyle::Linear => VisualStyle::Mirrored,
            VisualStyle::Mirrored => VisualStyle::Bars,
            VisualStyle::Bars => VisualStyle::Linear,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VisualStyle::Linear => "linear",
            VisualStyle::Mirrored => "mirrored",
            VisualStyle::Bars => "bars",
        }
    }
}

impl fmt::Display for VisualStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisualStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "linear" => Ok(VisualStyle::Linear),
            "mirrored" => Ok(VisualStyle::Mirrored),
            "bars" => Ok(VisualStyle::Bars),
            other => Err(format!(
                "Unknown visual style '{other}' (expected linear, mirrored or bars)"
            )),
        }
    }
}

/// Every key `set_value` and `get_value` understand, in file order
pub const CONFIG_KEYS: [&str; 8] = [
    "volume",
    "fft_size",
    "visual_style",
    "amplitude_px",
    "frame_rate_hz",
    "seek_step_secs",
    "volume_step",
    "log_file",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    #[serde(default = "default_visual_style")]
    pub visual_style: VisualStyle,
    #[serde(default = "default_amplitude_px")]
    pub amplitude_px: f64,
    #[serde(default = "default_frame_rate_hz")]
    pub frame_rate_hz: u32,
    #[serde(default = "default_seek_step_secs")]
    pub seek_step_secs: f64,
    #[serde(default = "default_volume_step")]
    pub volume_step: f32,
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

fn default_volume() -> f32 {
    1.0
}

fn default_fft_size() -> usize {
    256
}

fn default_visual_style() -> VisualStyle {
    VisualStyle::Mirrored
}

fn default_amplitude_px() -> f64 {
    150.0
}

fn default_frame_rate_hz() -> u32 {
    30
}

fn default_seek_step_secs() -> f64 {
    5.0
}

fn default_volume_step() -> f32 {
    0.05
}

fn default_log_file() -> String {
    std::env::temp_dir()
        .join("tonedeck.log")
        .to_string_lossy()
        .to_string()
}

/// Check that an analysis window size is a power of two within the accepted range
pub fn validate_fft_size(size: usize) -> Result<usize, Box<dyn Error>> {
    if !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&size) || !size.is_power_of_two() {
        return Err(format!(
            "fft_size must be a power of two between {MIN_FFT_SIZE} and {MAX_FFT_SIZE}, got {size}"
        )
        .into());
    }
    Ok(size)
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            volume: default_volume(),
            fft_size: default_fft_size(),
            visual_style: default_visual_style(),
            amplitude_px: default_amplitude_px(),
            frame_rate_hz: default_frame_rate_hz(),
            seek_step_secs: default_seek_step_secs(),
            volume_step: default_volume_step(),
            log_file: default_log_file(),
        }
    }

    pub fn config_dir() -> Result<PathBuf, Box<dyn Error>> {
        // Check for XDG_CONFIG_HOME first (useful for testing)
        let config_dir = if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(xdg_config).join("tonedeck")
        } else {
            dirs::config_dir()
                .ok_or("Unable to find config directory")?
                .join("tonedeck")
        };
        Ok(config_dir)
    }

    pub fn config_path() -> Result<PathBuf, Box<dyn Error>> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn load() -> Result<Self, Box<dyn Error>> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Default::default());
        }

        let contents = fs::read_to_string(&config_path)?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| format!("{}: {e}", config_path.display()))?;
        config
            .validate()
            .map_err(|e| format!("{}: {e}", config_path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<(), Box<dyn Error>> {
        let config_dir = Self::config_dir()?;

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)?;
        }

        let config_path = Self::config_path()?;
        let toml_string = toml::to_string_pretty(self)?;
        fs::write(&config_path, toml_string)?;

        Ok(())
    }

    pub fn exists() -> Result<bool, Box<dyn Error>> {
        Ok(Self::config_path()?.exists())
    }

    /// Check every field against the range the player can work with
    pub fn validate(&self) -> Result<(), Box<dyn Error>> {
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(format!("volume must be between 0 and 1, got {}", self.volume).into());
        }
        validate_fft_size(self.fft_size)?;
        if !(self.amplitude_px.is_finite() && self.amplitude_px > 0.0) {
            return Err(format!("amplitude_px must be positive, got {}", self.amplitude_px).into());
        }
        if !(1..=240).contains(&self.frame_rate_hz) {
            return Err(format!(
                "frame_rate_hz must be between 1 and 240, got {}",
                self.frame_rate_hz
            )
            .into());
        }
        if !(self.seek_step_secs.is_finite() && self.seek_step_secs > 0.0) {
            return Err(format!(
                "seek_step_secs must be positive, got {}",
                self.seek_step_secs
            )
            .into());
        }
        if !(self.volume_step > 0.0 && self.volume_step <= 1.0) {
            return Err(format!(
                "volume_step must be above 0 and at most 1, got {}",
                self.volume_step
            )
            .into());
        }
        Ok(())
    }

    /// Current value of `key` as it would be written to the file
    pub fn get_value(&self, key: &str) -> Option<String> {
        let value = match key {
            "volume" => self.volume.to_string(),
            "fft_size" => self.fft_size.to_string(),
            "visual_style" => self.visual_style.to_string(),
            "amplitude_px" => self.amplitude_px.to_string(),
            "frame_rate_hz" => self.frame_rate_hz.to_string(),
            "seek_step_secs" => self.seek_step_secs.to_string(),
            "volume_step" => self.volume_step.to_string(),
            "log_file" => self.log_file.clone(),
            _ => return None,
        };
        Some(value)
    }

    /// Parse `value` for `key` and store it if the resulting configuration
    /// is valid. On error nothing changes.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let mut updated = self.clone();
        match key {
            "volume" => updated.volume = parse_number(key, value)?,
            "fft_size" => updated.fft_size = parse_number(key, value)?,
            "visual_style" => updated.visual_style = value.parse::<VisualStyle>()?,
            "amplitude_px" => updated.amplitude_px = parse_number(key, value)?,
            "frame_rate_hz" => updated.frame_rate_hz = parse_number(key, value)?,
            "seek_step_secs" => updated.seek_step_secs = parse_number(key, value)?,
            "volume_step" => updated.volume_step = parse_number(key, value)?,
            "log_file" => updated.log_file = shellexpand::tilde(value).to_string(),
            _ => return Err(format!("Unknown configuration key: {key}").into()),
        }
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, Box<dyn Error>> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| format!("{key} expects a number, got '{value}'").into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    // Use a mutex to ensure tests that modify environment variables don't run concurrently
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_config_new() {
        let config = Config::new();
        assert_eq!(config.volume, 1.0);
        assert_eq!(config.fft_size, 256);
        assert_eq!(config.visual_style, VisualStyle::Mirrored);
        assert_eq!(config.amplitude_px, 150.0);
        assert!(config.log_file.ends_with("tonedeck.log"));
    }

    #[test]
    fn test_validate_fft_size() {
        assert!(validate_fft_size(32).is_ok());
        assert!(validate_fft_size(256).is_ok());
        assert!(validate_fft_size(32768).is_ok());
        assert!(validate_fft_size(16).is_err());
        assert!(validate_fft_size(65536).is_err());
        assert!(validate_fft_size(100).is_err());
    }

    #[test]
    fn test_visual_style_parse_and_cycle() {
        assert_eq!("Linear".parse::<VisualStyle>(), Ok(VisualStyle::Linear));
        assert_eq!(" bars ".parse::<VisualStyle>(), Ok(VisualStyle::Bars));
        assert!("radial".parse::<VisualStyle>().is_err());

        let style = VisualStyle::Linear;
        assert_eq!(style.next(), VisualStyle::Mirrored);
        assert_eq!(style.next().next(), VisualStyle::Bars);
        assert_eq!(style.next().next().next(), VisualStyle::Linear);
    }

    #[test]
    fn test_set_value() {
        let mut config = Config::new();

        config.set_value("volume", "0.5").unwrap();
        assert_eq!(config.volume, 0.5);
        assert!(config.set_value("volume", "1.5").is_err());
        assert!(config.set_value("volume", "loud").is_err());

        config.set_value("fft_size", "1024").unwrap();
        assert_eq!(config.fft_size, 1024);
        assert!(config.set_value("fft_size", "1000").is_err());

        config.set_value("visual_style", "bars").unwrap();
        assert_eq!(config.visual_style, VisualStyle::Bars);

        config.set_value("seek_step_secs", "2.5").unwrap();
        assert_eq!(config.seek_step_secs, 2.5);
        assert!(config.set_value("seek_step_secs", "-1").is_err());

        assert!(config.set_value("frame_rate_hz", "0").is_err());
        assert!(config.set_value("volume_step", "2").is_err());

        let result = config.set_value("unknown_key", "value");
        assert!(result.is_err());

        // Rejected values leave the config untouched
        assert!(config.set_value("amplitude_px", "nan").is_err());
        assert_eq!(config.amplitude_px, 150.0);
        assert_eq!(config.volume, 0.5);
    }

    #[test]
    fn test_validate_names_the_field() {
        let config = Config {
            frame_rate_hz: 0,
            ..Config::new()
        };
        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("frame_rate_hz"), "{message}");

        let config = Config {
            fft_size: 300,
            ..Config::new()
        };
        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("fft_size"), "{message}");
        assert!(message.contains("300"), "{message}");

        assert!(Config::new().validate().is_ok());
    }

    #[test]
    fn test_get_value_matches_keys() {
        let mut config = Config::new();
        config.set_value("log_file", "/tmp/deck.log").unwrap();

        for key in CONFIG_KEYS {
            assert!(config.get_value(key).is_some(), "{key}");
        }
        assert_eq!(config.get_value("visual_style").as_deref(), Some("mirrored"));
        assert_eq!(config.get_value("log_file").as_deref(), Some("/tmp/deck.log"));
        assert_eq!(config.get_value("colour"), None);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("fft_size = 64\n").unwrap();
        assert_eq!(config.fft_size, 64);
        assert_eq!(config.visual_style, VisualStyle::Mirrored);
        assert_eq!(config.frame_rate_hz, 30);
    }

    #[test]
    fn test_config_save_and_load() {
        let _guard = ENV_MUTEX.lock().unwrap();

        let temp_dir = TempDir::new().unwrap();
        let original_xdg = std::env::var("XDG_CONFIG_HOME").ok();
        unsafe {
            std::env::set_var("XDG_CONFIG_HOME", temp_dir.path());
        }

        let mut config = Config::new();
        config.visual_style = VisualStyle::Linear;
        config.fft_size = 512;
        config.save().unwrap();

        let config_path = Config::config_path().unwrap();
        assert!(config_path.exists());
        assert!(config_path.starts_with(temp_dir.path().join("tonedeck")));

        let loaded = Config::load().unwrap();
        assert_eq!(loaded.visual_style, VisualStyle::Linear);
        assert_eq!(loaded.fft_size, 512);

        unsafe {
            if let Some(original) = original_xdg {
                std::env::set_var("XDG_CONFIG_HOME", original);
            } else {
                std::env::remove_var("XDG_CONFIG_HOME");
            }
        }
    }

    #[test]
    fn test_load_rejects_bad_fft_size() {
        let _guard = ENV_MUTEX.lock().unwrap();

        let temp_dir = TempDir::new().unwrap();
        let original_xdg = std::env::var("XDG_CONFIG_HOME").ok();
        unsafe {
            std::env::set_var("XDG_CONFIG_HOME", temp_dir.path());
        }

        let dir = temp_dir.path().join("tonedeck");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        fs::write(&path, "fft_size = 300\n").unwrap();
        let message = Config::load().unwrap_err().to_string();
        assert!(message.contains("fft_size must be a power of two"), "{message}");
        assert!(message.contains(&path.display().to_string()), "{message}");

        unsafe {
            if let Some(original) = original_xdg {
                std::env::set_var("XDG_CONFIG_HOME", original);
            } else {
                std::env::remove_var("XDG_CONFIG_HOME");
            }
        }
    }
}
