use crate::audio::ring_buffer::SampleRing;
use crate::error::{ChordscopeError, Result};
use std::sync::{Arc, Mutex, PoisonError};

/// Trait for audio capture backends.
///
/// This trait allows swapping implementations (real audio device vs mock).
/// The shared ring handle is passed at start time; the backend's capture
/// callback is the sole writer for the duration of the run.
pub trait CaptureSource: Send + Sync {
    /// Begin producing samples into `sink`.
    ///
    /// Calling `start` while already producing must rewire output into the
    /// new sink; samples must never keep flowing into a sink from an
    /// earlier call.
    ///
    /// # Arguments
    /// * `device` - Input device enumeration index; None uses the default device
    /// * `sink` - Ring buffer the capture callback writes into
    fn start(&mut self, device: Option<usize>, sink: Arc<SampleRing>) -> Result<()>;

    /// Halt the producer. Must be safe to call when not started.
    fn stop(&mut self) -> Result<()>;
}

/// Mock capture source for testing.
///
/// Records the sink handed to `start` and pushes a configured waveform into
/// it in fixed-size chunks, the way a device callback would. Clones share
/// the recorded sink so tests can feed additional audio mid-session.
#[derive(Debug, Clone)]
pub struct MockCaptureSource {
    sink: Arc<Mutex<Option<Arc<SampleRing>>>>,
    started: Arc<Mutex<bool>>,
    waveform: Vec<f32>,
    chunk_size: usize,
    should_fail_start: bool,
    should_fail_stop: bool,
    error_message: String,
}

impl MockCaptureSource {
    /// Create a new mock capture source with default settings
    pub fn new() -> Self {
        Self {
            sink: Arc::new(Mutex::new(None)),
            started: Arc::new(Mutex::new(false)),
            waveform: Vec::new(),
            chunk_size: 1024,
            should_fail_start: false,
            should_fail_stop: false,
            error_message: "mock capture error".to_string(),
        }
    }

    /// Configure a waveform pushed into the sink when the mock starts
    pub fn with_waveform(mut self, waveform: Vec<f32>) -> Self {
        self.waveform = waveform;
        self
    }

    /// Configure the chunk size used when pushing the waveform
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Configure the mock to fail on start
    pub fn with_start_failure(mut self) -> Self {
        self.should_fail_start = true;
        self
    }

    /// Configure the mock to fail on stop
    pub fn with_stop_failure(mut self) -> Self {
        self.should_fail_stop = true;
        self
    }

    /// Configure the error message for failures
    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    /// Check if the capture source is started
    pub fn is_started(&self) -> bool {
        *self
            .started
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Push samples into the sink recorded at start, in configured chunks.
    ///
    /// No-op when the mock was never started.
    pub fn push(&self, samples: &[f32]) {
        let sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(ring) = sink.as_ref() {
            for chunk in samples.chunks(self.chunk_size) {
                ring.push(chunk);
            }
        }
    }
}

impl Default for MockCaptureSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureSource for MockCaptureSource {
    fn start(&mut self, _device: Option<usize>, sink: Arc<SampleRing>) -> Result<()> {
        if self.should_fail_start {
            return Err(ChordscopeError::AudioCapture {
                message: self.error_message.clone(),
            });
        }
        *self.sink.lock().unwrap_or_else(PoisonError::into_inner) = Some(sink);
        *self.started.lock().unwrap_or_else(PoisonError::into_inner) = true;

        let waveform = self.waveform.clone();
        self.push(&waveform);
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if self.should_fail_stop {
            return Err(ChordscopeError::AudioCapture {
                message: self.error_message.clone(),
            });
        }
        *self.started.lock().unwrap_or_else(PoisonError::into_inner) = false;
        Ok(())
    }
}
