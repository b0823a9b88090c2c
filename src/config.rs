use crate::defaults;
use crate::error::{ChordscopeError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub recognition: RecognitionConfig,
}

/// Audio capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    /// Input device index as reported by device enumeration. None = default device.
    pub device: Option<usize>,
    pub sample_rate: u32,
    /// Rolling capture buffer length in seconds.
    pub buffer_seconds: f32,
    /// Analysis window length in seconds. Must not exceed `buffer_seconds`.
    pub window_seconds: f32,
}

/// Recognition loop configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecognitionConfig {
    pub tick_interval_ms: u64,
    pub silence_rms_threshold: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: defaults::SAMPLE_RATE,
            buffer_seconds: defaults::BUFFER_SECONDS,
            window_seconds: defaults::WINDOW_SECONDS,
        }
    }
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: defaults::TICK_INTERVAL_MS,
            silence_rms_threshold: defaults::SILENCE_RMS_THRESHOLD,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Self::default()
                } else {
                    // Re-panic on invalid TOML or other errors
                    panic!("Failed to load config from {}: {}", path.display(), e);
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - CHORDSCOPE_AUDIO_DEVICE → audio.device (enumeration index)
    /// - CHORDSCOPE_WINDOW_SECONDS → audio.window_seconds
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(device) = std::env::var("CHORDSCOPE_AUDIO_DEVICE")
            && let Ok(index) = device.parse::<usize>()
        {
            self.audio.device = Some(index);
        }

        if let Ok(window) = std::env::var("CHORDSCOPE_WINDOW_SECONDS")
            && let Ok(seconds) = window.parse::<f32>()
        {
            self.audio.window_seconds = seconds;
        }

        self
    }

    /// Check invariants the recognition loop relies on.
    ///
    /// A validated config guarantees the analysis window always fits inside
    /// the rolling buffer, so a segment read can never exceed capacity at
    /// runtime.
    pub fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(ChordscopeError::ConfigInvalidValue {
                key: "audio.sample_rate".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if !(self.audio.window_seconds > 0.0) {
            return Err(ChordscopeError::ConfigInvalidValue {
                key: "audio.window_seconds".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.audio.window_seconds > self.audio.buffer_seconds {
            return Err(ChordscopeError::ConfigInvalidValue {
                key: "audio.window_seconds".to_string(),
                message: format!(
                    "must not exceed buffer_seconds ({})",
                    self.audio.buffer_seconds
                ),
            });
        }
        if self.recognition.tick_interval_ms == 0 {
            return Err(ChordscopeError::ConfigInvalidValue {
                key: "recognition.tick_interval_ms".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if !(self.recognition.silence_rms_threshold >= 0.0) {
            return Err(ChordscopeError::ConfigInvalidValue {
                key: "recognition.silence_rms_threshold".to_string(),
                message: "must not be negative".to_string(),
            });
        }
        Ok(())
    }

    /// Ring buffer capacity in samples implied by this config.
    pub fn buffer_capacity(&self) -> usize {
        (self.audio.sample_rate as f32 * self.audio.buffer_seconds).round() as usize
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/chordscope/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .expect("Could not determine config directory")
            .join("chordscope")
            .join("config.toml")
    }
}
