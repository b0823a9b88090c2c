//! RMS energy gate in front of the real classifier.
//!
//! Cheap amplitude check that short-circuits quiet windows to `Silence`
//! without waking the model. The model only ever sees windows that carry
//! audible signal.

use crate::audio::segment::AudioSegment;
use crate::classify::classifier::Classifier;
use crate::classify::label::Label;
use crate::defaults;
use crate::error::Result;

/// Wraps a classifier with an RMS silence gate.
///
/// Empty segments (buffer warm-up) yield `Unknown`; segments with RMS
/// strictly below the threshold yield `Silence`. Everything else is
/// delegated to the inner classifier.
pub struct EnergyGatedClassifier<C> {
    inner: C,
    threshold: f32,
}

impl<C: Classifier> EnergyGatedClassifier<C> {
    pub fn new(inner: C, threshold: f32) -> Self {
        Self { inner, threshold }
    }

    pub fn with_default_threshold(inner: C) -> Self {
        Self::new(inner, defaults::SILENCE_RMS_THRESHOLD)
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

impl<C: Classifier> Classifier for EnergyGatedClassifier<C> {
    fn classify(&self, segment: &AudioSegment) -> Result<Label> {
        if segment.is_empty() {
            return Ok(Label::Unknown);
        }
        if segment.rms() < self.threshold {
            return Ok(Label::Silence);
        }
        self.inner.classify(segment)
    }

    fn is_ready(&self) -> bool {
        self.inner.is_ready()
    }
}
