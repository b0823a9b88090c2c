//! Default configuration constants for chordscope.
//!
//! This module provides shared constants used across different configuration
//! types so the capture, extraction and stabilization stages agree on the
//! same timing assumptions.

/// Default audio sample rate in Hz.
///
/// 22.05kHz preserves enough spectral detail for chord discrimination while
/// keeping per-window analysis cheap.
pub const SAMPLE_RATE: u32 = 22_050;

/// Rolling capture buffer duration in seconds.
///
/// The ring keeps the most recent 3 seconds of audio; anything older is
/// overwritten by the capture callback. Must be at least `WINDOW_SECONDS`.
pub const BUFFER_SECONDS: f32 = 3.0;

/// Analysis window duration in seconds.
///
/// Each tick classifies the most recent 0.75s of audio: long enough to span
/// a full strum, short enough to track chord changes.
pub const WINDOW_SECONDS: f32 = 0.75;

/// Polling loop tick interval in milliseconds.
pub const TICK_INTERVAL_MS: u64 = 80;

/// Number of raw labels kept for the majority vote.
///
/// With an 80ms tick, eight entries cover roughly the last 640ms of
/// predictions, which is the latency cost of suppressing flicker.
pub const HISTORY_LEN: usize = 8;

/// RMS energy below which a segment is treated as silence.
///
/// Applied by the classifier adapter before the model is invoked, so silent
/// windows never pay for inference.
pub const SILENCE_RMS_THRESHOLD: f32 = 0.003;

/// Bounded wait for the polling task to exit during `stop()`, in milliseconds.
///
/// The task observes the stop flag at the top of each tick; if it has not
/// exited after this long it is aborted and the caller proceeds.
pub const STOP_JOIN_TIMEOUT_MS: u64 = 1_000;
