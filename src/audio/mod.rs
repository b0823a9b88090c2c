//! Audio capture and buffering.
//!
//! A capture backend (real device or mock) pushes samples into a shared
//! [`SampleRing`]; the recognition loop snapshots the most recent analysis
//! window from it with [`extract_segment`].

#[cfg(feature = "cpal-audio")]
pub mod capture;
pub mod ring_buffer;
pub mod segment;
pub mod source;

#[cfg(feature = "cpal-audio")]
pub use capture::{AudioDevice, CpalCapture, list_devices};
pub use ring_buffer::SampleRing;
pub use segment::{AudioSegment, extract_segment};
pub use source::{CaptureSource, MockCaptureSource};
