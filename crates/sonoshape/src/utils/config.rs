//! Configuration file management.
//!
//! Handles loading and saving host preferences to `~/.sonoshape.toml`.
//! Every field is optional; accessors fall back to the built-in defaults.

use serde::{Deserialize, Serialize};
use sonoshape_core::{Calibration, PipelineSettings};
use std::fs;
use std::path::PathBuf;

const DEFAULT_DEVICE_TIMEOUT_SECS: u64 = 3;
const DEFAULT_TICK_RATE_HZ: f32 = 30.0;

const CONFIG_TEMPLATE: &str = r#"# sonoshape configuration file

# Timeout in seconds when opening an audio device (default: 3)
# device_timeout_secs = 3

# Last selected input device (auto-saved)
# last_device = "Device Name"

# UI refresh rate driving smoothing and the category trend (default: 30)
# tick_rate_hz = 30.0

# =============================================================================
# Analysis
# =============================================================================

# FFT window in samples (default: 1024)
# fft_size = 1024

# Calibration for the capture chain. Tuned against one microphone gain;
# re-tune per device rather than treating these as physical constants.
# band_gain = 10.0     # Multiplier on mean band magnitude before clamping
# db_floor = -60.0     # Level (dB) mapped to zero loudness

# =============================================================================
# Queues
# =============================================================================

# Analyzed frames buffered between ticks (default: 8)
# frame_queue_capacity = 8

# Classifier batches buffered between ticks (default: 4)
# classification_queue_capacity = 4
"#;

#[derive(Serialize, Deserialize, Default, Debug, PartialEq)]
pub struct Config {
    pub last_device: Option<String>,
    pub device_timeout_secs: Option<u64>,
    pub tick_rate_hz: Option<f32>,

    // Analysis
    pub fft_size: Option<usize>,
    pub band_gain: Option<f32>,
    pub db_floor: Option<f32>,

    // Queues
    pub frame_queue_capacity: Option<usize>,
    pub classification_queue_capacity: Option<usize>,
}

impl Config {
    fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".sonoshape.toml"))
    }

    pub fn load() -> Self {
        let path = match Self::path() {
            Some(p) => p,
            None => return Self::default(),
        };

        // Create template file if it doesn't exist
        if !path.exists() {
            match fs::write(&path, CONFIG_TEMPLATE) {
                Ok(()) => log::info!("Created config template at {}", path.display()),
                Err(e) => log::warn!("Could not write config template: {}", e),
            }
        }

        match fs::read_to_string(&path) {
            Ok(s) => toml::from_str(&s).unwrap_or_else(|e| {
                log::warn!("Ignoring malformed config {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) {
        if let Some(path) = Self::path() {
            match toml::to_string(self) {
                Ok(content) => match fs::write(&path, &content) {
                    Ok(()) => log::debug!("Config saved to {}", path.display()),
                    Err(e) => log::warn!("Could not save config: {}", e),
                },
                Err(e) => log::warn!("Could not serialize config: {}", e),
            }
        }
    }

    pub fn set_device(&mut self, name: &str) {
        self.last_device = Some(name.to_string());
        self.save();
    }

    pub fn device_timeout_secs(&self) -> u64 {
        self.device_timeout_secs.unwrap_or(DEFAULT_DEVICE_TIMEOUT_SECS)
    }

    pub fn tick_rate_hz(&self) -> f32 {
        self.tick_rate_hz.unwrap_or(DEFAULT_TICK_RATE_HZ)
    }

    /// Pipeline settings with defaults for anything not configured
    pub fn pipeline_settings(&self) -> PipelineSettings {
        let defaults = PipelineSettings::default();
        let calibration = Calibration::default();
        PipelineSettings {
            fft_size: self.fft_size.unwrap_or(defaults.fft_size),
            calibration: Calibration {
                band_gain: self.band_gain.unwrap_or(calibration.band_gain),
                db_floor: self.db_floor.unwrap_or(calibration.db_floor),
            },
            frame_queue_capacity: self
                .frame_queue_capacity
                .unwrap_or(defaults.frame_queue_capacity),
            classification_queue_capacity: self
                .classification_queue_capacity
                .unwrap_or(defaults.classification_queue_capacity),
        }
    }
}
