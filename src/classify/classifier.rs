use crate::audio::segment::AudioSegment;
use crate::classify::label::Label;
use crate::error::{ChordscopeError, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Trait for chord classification backends.
///
/// This trait allows swapping implementations (real model vs mock).
/// `classify` may block; the recognition loop runs it on a blocking
/// worker thread, never inside the async executor.
pub trait Classifier: Send + Sync {
    /// Produce a verdict for one analysis window.
    fn classify(&self, segment: &AudioSegment) -> Result<Label>;

    /// Whether the backend is loaded and able to classify.
    fn is_ready(&self) -> bool;
}

impl<T: Classifier + ?Sized> Classifier for Arc<T> {
    fn classify(&self, segment: &AudioSegment) -> Result<Label> {
        (**self).classify(segment)
    }

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }
}

/// Mock classifier for testing.
///
/// Plays back a scripted sequence of labels, repeating the last entry once
/// the script runs out. Clones share the call counter so tests can assert
/// how often the backend was consulted.
#[derive(Debug, Clone)]
pub struct MockClassifier {
    script: Vec<Label>,
    calls: Arc<AtomicUsize>,
    fail_after: Option<usize>,
    error_message: String,
    ready: bool,
}

impl MockClassifier {
    /// Create a new mock classifier with default settings
    pub fn new() -> Self {
        Self {
            script: Vec::new(),
            calls: Arc::new(AtomicUsize::new(0)),
            fail_after: None,
            error_message: "mock classification error".to_string(),
            ready: true,
        }
    }

    /// Configure the sequence of labels to return, one per call.
    /// The last entry repeats indefinitely.
    pub fn with_script(mut self, script: Vec<Label>) -> Self {
        self.script = script;
        self
    }

    /// Configure the mock to fail starting with the given call index (0-based)
    pub fn with_failure_after(mut self, calls: usize) -> Self {
        self.fail_after = Some(calls);
        self
    }

    /// Configure the error message for failures
    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    /// Configure the mock to report not-ready
    pub fn with_not_ready(mut self) -> Self {
        self.ready = false;
        self
    }

    /// Number of classify calls so far, shared across clones
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for MockClassifier {
    fn classify(&self, _segment: &AudioSegment) -> Result<Label> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(threshold) = self.fail_after
            && call >= threshold
        {
            return Err(ChordscopeError::Classification {
                message: self.error_message.clone(),
            });
        }

        if self.script.is_empty() {
            return Ok(Label::Unknown);
        }
        Ok(self.script[call.min(self.script.len() - 1)].clone())
    }

    fn is_ready(&self) -> bool {
        self.ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment() -> AudioSegment {
        AudioSegment::new(vec![0.1; 64], 22_050)
    }

    #[test]
    fn test_mock_plays_script_then_repeats_last() {
        let mock = MockClassifier::new().with_script(vec![
            Label::Silence,
            Label::Chord("Am".to_string()),
        ]);

        assert_eq!(mock.classify(&segment()).unwrap(), Label::Silence);
        assert_eq!(
            mock.classify(&segment()).unwrap(),
            Label::Chord("Am".to_string())
        );
        assert_eq!(
            mock.classify(&segment()).unwrap(),
            Label::Chord("Am".to_string())
        );
        assert_eq!(mock.call_count(), 3);
    }

    #[test]
    fn test_mock_empty_script_returns_unknown() {
        let mock = MockClassifier::new();
        assert_eq!(mock.classify(&segment()).unwrap(), Label::Unknown);
    }

    #[test]
    fn test_mock_failure_after_threshold() {
        let mock = MockClassifier::new()
            .with_script(vec![Label::Silence])
            .with_failure_after(1)
            .with_error_message("model crashed");

        assert!(mock.classify(&segment()).is_ok());
        match mock.classify(&segment()) {
            Err(ChordscopeError::Classification { message }) => {
                assert_eq!(message, "model crashed");
            }
            other => panic!("Expected Classification error, got {:?}", other),
        }
    }

    #[test]
    fn test_clones_share_call_counter() {
        let mock = MockClassifier::new().with_script(vec![Label::Silence]);
        let clone = mock.clone();

        clone.classify(&segment()).unwrap();
        clone.classify(&segment()).unwrap();
        assert_eq!(mock.call_count(), 2);
    }

    #[test]
    fn test_not_ready_flag() {
        assert!(MockClassifier::new().is_ready());
        assert!(!MockClassifier::new().with_not_ready().is_ready());
    }

    #[test]
    fn test_classifier_usable_through_arc_dyn() {
        let classifier: Arc<dyn Classifier> =
            Arc::new(MockClassifier::new().with_script(vec![Label::Silence]));
        assert_eq!(classifier.classify(&segment()).unwrap(), Label::Silence);
        assert!(classifier.is_ready());
    }
}
