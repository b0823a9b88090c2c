//! chordscope: real-time chord recognition capture and stabilization engine.
//!
//! Audio flows from a capture backend into a rolling sample ring; a periodic
//! loop snapshots the most recent analysis window, classifies it behind an
//! RMS silence gate, and debounces the raw verdicts into a stable label that
//! observers poll through the session status.

#![warn(clippy::all)]

pub mod audio;
pub mod classify;
pub mod config;
pub mod defaults;
pub mod error;
pub mod session;

#[cfg(feature = "cpal-audio")]
pub use audio::{AudioDevice, CpalCapture, list_devices};
pub use audio::{AudioSegment, CaptureSource, MockCaptureSource, SampleRing, extract_segment};
pub use classify::{
    Classifier, EnergyGatedClassifier, Label, MockClassifier, StabilityFilter, StableLabel,
};
pub use config::Config;
pub use error::{ChordscopeError, Result};
pub use session::{RecognitionSession, SessionState, StatusReport};
