//! Error types for chordscope.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChordscopeError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    // Audio capture errors
    #[error("Audio device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Audio capture failed: {message}")]
    AudioCapture { message: String },

    // Ring buffer errors
    #[error("Requested {requested} samples but the buffer holds at most {capacity}")]
    InsufficientCapacity { requested: usize, capacity: usize },

    #[error("Buffer has seen only {written} of the {requested} samples requested")]
    InsufficientData { written: u64, requested: usize },

    // Classification errors
    #[error("Classification failed: {message}")]
    Classification { message: String },

    #[error("Classifier is not loaded")]
    ClassifierUnavailable,

    // Session errors
    #[error("Recognition is already active")]
    AlreadyActive,

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, ChordscopeError>;
