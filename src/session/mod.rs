//! Recognition session lifecycle.
//!
//! A session owns the capture producer, the shared sample ring, and the
//! recognition loop task. Callers drive it with [`RecognitionSession::start`],
//! [`RecognitionSession::stop`], and [`RecognitionSession::status`]; the loop
//! publishes its debounced label through the status snapshot.

use crate::audio::ring_buffer::SampleRing;
use crate::audio::segment::extract_segment;
use crate::audio::source::CaptureSource;
use crate::classify::classifier::Classifier;
use crate::classify::label::StableLabel;
use crate::classify::stability::StabilityFilter;
use crate::config::Config;
use crate::defaults;
use crate::error::{ChordscopeError, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Internal lifecycle phase. `Starting` and `Stopping` exist so concurrent
/// calls observe a consistent answer while a transition is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionPhase {
    Idle,
    Starting,
    Listening,
    Stopping,
}

/// Externally visible session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Listening,
    Stopped,
}

/// Snapshot of the session handed to observers, JSON-serializable for
/// whatever surface sits on top of the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub state: SessionState,
    /// Display form of the current stable label.
    pub label: String,
    /// Detail of the failure that terminated the loop, if any.
    pub error: Option<String>,
}

impl StatusReport {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ChordscopeError::Other(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ChordscopeError::Other(e.to_string()))
    }
}

/// What the recognition loop last published.
#[derive(Debug, Clone)]
struct Published {
    label: StableLabel,
    error: Option<String>,
}

struct ActiveLoop {
    handle: JoinHandle<()>,
    stop: Arc<AtomicBool>,
}

/// Owner of one capture-and-recognize pipeline.
///
/// All methods take `&self`; the session is safe to share behind an `Arc`
/// with one task calling `start`/`stop` and others polling `status`.
pub struct RecognitionSession {
    config: Config,
    capture: Mutex<Box<dyn CaptureSource>>,
    classifier: Option<Arc<dyn Classifier>>,
    phase: Arc<Mutex<SessionPhase>>,
    published: Arc<Mutex<Published>>,
    active: Mutex<Option<ActiveLoop>>,
}

fn lock<'a, T>(mutex: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RecognitionSession {
    /// Create a session around a capture backend. No classifier is attached
    /// yet; `start` refuses to run without one.
    pub fn new(config: Config, capture: Box<dyn CaptureSource>) -> Self {
        Self {
            config,
            capture: Mutex::new(capture),
            classifier: None,
            phase: Arc::new(Mutex::new(SessionPhase::Idle)),
            published: Arc::new(Mutex::new(Published {
                label: StableLabel::AwaitingInput,
                error: None,
            })),
            active: Mutex::new(None),
        }
    }

    /// Attach the classification backend.
    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Begin capturing and recognizing.
    ///
    /// `device` overrides the configured input device for this run. The call
    /// returns once the capture stream is live and the loop task is spawned;
    /// recognition output arrives asynchronously through `status`.
    ///
    /// # Errors
    /// `AlreadyActive` when a session is running, `ClassifierUnavailable`
    /// when no ready classifier is attached, `ConfigInvalidValue` or
    /// `AudioCapture`/`AudioDeviceNotFound` when setup fails. On any error
    /// the session is left idle.
    pub async fn start(&self, device: Option<usize>) -> Result<()> {
        self.config.validate()?;

        {
            let mut phase = lock(&self.phase);
            if *phase != SessionPhase::Idle {
                return Err(ChordscopeError::AlreadyActive);
            }
            *phase = SessionPhase::Starting;
        }

        let classifier = match &self.classifier {
            Some(c) if c.is_ready() => Arc::clone(c),
            _ => {
                *lock(&self.phase) = SessionPhase::Idle;
                return Err(ChordscopeError::ClassifierUnavailable);
            }
        };

        let ring = Arc::new(SampleRing::new(self.config.buffer_capacity()));
        let device = device.or(self.config.audio.device);

        if let Err(e) = lock(&self.capture).start(device, Arc::clone(&ring)) {
            *lock(&self.phase) = SessionPhase::Idle;
            return Err(e);
        }

        *lock(&self.published) = Published {
            label: StableLabel::Listening,
            error: None,
        };

        let stop = Arc::new(AtomicBool::new(false));
        // Listening is set before the loop spawns so a fatal first tick can
        // only ever move the phase forward to Idle, never race backwards.
        *lock(&self.phase) = SessionPhase::Listening;

        let handle = tokio::spawn(run_loop(
            self.config.clone(),
            ring,
            classifier,
            Arc::clone(&stop),
            Arc::clone(&self.phase),
            Arc::clone(&self.published),
        ));

        *lock(&self.active) = Some(ActiveLoop { handle, stop });
        Ok(())
    }

    /// Stop the loop and the capture stream.
    ///
    /// Waits up to a second for the loop task to notice the stop flag, then
    /// aborts it. Safe to call when the session is already idle, including
    /// after the loop terminated itself on an error; the capture backend is
    /// stopped either way.
    pub async fn stop(&self) -> Result<()> {
        let active = lock(&self.active).take();

        if let Some(active) = active {
            *lock(&self.phase) = SessionPhase::Stopping;
            active.stop.store(true, Ordering::SeqCst);

            let timeout = Duration::from_millis(defaults::STOP_JOIN_TIMEOUT_MS);
            let abort = active.handle.abort_handle();
            if tokio::time::timeout(timeout, active.handle)
                .await
                .is_err()
            {
                eprintln!("chordscope: recognition loop did not stop in time, aborting");
                abort.abort();
            }
        }

        let stop_result = lock(&self.capture).stop();
        *lock(&self.published) = Published {
            label: StableLabel::AwaitingInput,
            error: None,
        };
        *lock(&self.phase) = SessionPhase::Idle;
        stop_result
    }

    /// Snapshot the current state, label, and last error.
    pub fn status(&self) -> StatusReport {
        let phase = *lock(&self.phase);
        let published = lock(&self.published).clone();

        let state = match phase {
            SessionPhase::Listening | SessionPhase::Starting => SessionState::Listening,
            SessionPhase::Idle | SessionPhase::Stopping => SessionState::Stopped,
        };

        StatusReport {
            state,
            label: published.label.to_string(),
            error: published.error,
        }
    }
}

/// One recognition loop run. Terminates when the stop flag is raised or a
/// tick fails fatally, in which case the phase is dropped to Idle and the
/// failure detail is published.
async fn run_loop(
    config: Config,
    ring: Arc<SampleRing>,
    classifier: Arc<dyn Classifier>,
    stop: Arc<AtomicBool>,
    phase: Arc<Mutex<SessionPhase>>,
    published: Arc<Mutex<Published>>,
) {
    let mut filter = StabilityFilter::new();
    filter.reset_to(StableLabel::Listening);

    let mut tick =
        tokio::time::interval(Duration::from_millis(config.recognition.tick_interval_ms));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let sample_rate = config.audio.sample_rate;
    let window_seconds = config.audio.window_seconds;

    while !stop.load(Ordering::SeqCst) {
        tick.tick().await;
        if stop.load(Ordering::SeqCst) {
            break;
        }

        // A validated config keeps the window inside the ring, so extraction
        // can only fail on a misconfigured session; skip the tick rather
        // than kill the run over a read that may succeed later.
        let Ok(segment) = extract_segment(&ring, sample_rate, window_seconds) else {
            continue;
        };
        // An empty segment means the ring is still warming up; there is no
        // audio to classify yet, retry next tick.
        if segment.is_empty() {
            continue;
        }

        // Classification may be CPU-heavy; keep it off the async executor.
        let worker = Arc::clone(&classifier);
        let verdict =
            tokio::task::spawn_blocking(move || worker.classify(&segment)).await;

        match verdict {
            Ok(Ok(label)) => {
                if let Some(stable) = filter.update(label) {
                    let mut published = lock(&published);
                    published.label = stable;
                }
            }
            Ok(Err(e)) => {
                fail_loop(&phase, &published, &e.to_string());
                return;
            }
            Err(join_error) => {
                fail_loop(
                    &phase,
                    &published,
                    &format!("classification task failed: {}", join_error),
                );
                return;
            }
        }
    }
}

fn fail_loop(phase: &Mutex<SessionPhase>, published: &Mutex<Published>, detail: &str) {
    eprintln!("chordscope: recognition loop terminated: {}", detail);
    {
        let mut published = lock(published);
        published.error = Some(detail.to_string());
    }
    *lock(phase) = SessionPhase::Idle;
}
