//! Fixed-length audio snapshots handed to the classifier.

use crate::audio::ring_buffer::SampleRing;
use crate::error::{ChordscopeError, Result};

/// Ordered, owned snapshot of the most recent window of audio.
///
/// A pure value: produced fresh on each extraction, consumed immediately by
/// the classifier, never shared.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSegment {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioSegment {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// An empty segment, used while the capture buffer is still warming up.
    pub fn empty(sample_rate: u32) -> Self {
        Self::new(Vec::new(), sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_seconds(&self) -> f32 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.samples.len() as f32 / self.sample_rate as f32
        }
    }

    /// Root mean square energy of the samples; 0.0 for an empty segment.
    pub fn rms(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum_squares: f32 = self.samples.iter().map(|s| s * s).sum();
        (sum_squares / self.samples.len() as f32).sqrt()
    }
}

/// Snapshots the most recent `window_seconds` of audio from the ring.
///
/// Returns an empty segment while the ring has not yet seen enough samples;
/// warm-up is a retry-next-tick condition, not an error. A window that does
/// not fit the ring at all still fails with `InsufficientCapacity`.
pub fn extract_segment(
    ring: &SampleRing,
    sample_rate: u32,
    window_seconds: f32,
) -> Result<AudioSegment> {
    let n = (sample_rate as f32 * window_seconds).round() as usize;
    match ring.read_last(n) {
        Ok(samples) => Ok(AudioSegment::new(samples, sample_rate)),
        Err(ChordscopeError::InsufficientData { .. }) => Ok(AudioSegment::empty(sample_rate)),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rms_of_constant_signal() {
        let segment = AudioSegment::new(vec![0.5; 1000], 22_050);
        assert!((segment.rms() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_rms_of_sine_wave() {
        let amplitude = 0.8f32;
        let samples: Vec<f32> = (0..22_050)
            .map(|i| amplitude * (i as f32 * 2.0 * std::f32::consts::PI * 440.0 / 22_050.0).sin())
            .collect();
        let segment = AudioSegment::new(samples, 22_050);

        // RMS of a sine is amplitude / sqrt(2)
        let expected = amplitude / 2.0f32.sqrt();
        assert!((segment.rms() - expected).abs() < 0.01);
    }

    #[test]
    fn test_rms_of_empty_segment_is_zero() {
        let segment = AudioSegment::empty(22_050);
        assert_eq!(segment.rms(), 0.0);
        assert!(segment.is_empty());
    }

    #[test]
    fn test_duration_seconds() {
        let segment = AudioSegment::new(vec![0.0; 11_025], 22_050);
        assert!((segment.duration_seconds() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_extract_before_warmup_returns_empty_segment() {
        let ring = SampleRing::new(1000);
        ring.push(&[0.1; 100]);

        // Window needs 500 samples, only 100 seen so far
        let segment = extract_segment(&ring, 1000, 0.5).unwrap();
        assert!(segment.is_empty());
    }

    #[test]
    fn test_extract_returns_most_recent_window() {
        let ring = SampleRing::new(1000);
        let data: Vec<f32> = (0..800).map(|i| i as f32).collect();
        ring.push(&data);

        let segment = extract_segment(&ring, 1000, 0.5).unwrap();
        assert_eq!(segment.len(), 500);
        assert_eq!(segment.samples()[0], 300.0);
        assert_eq!(segment.samples()[499], 799.0);
    }

    #[test]
    fn test_extract_rounds_window_length() {
        let ring = SampleRing::new(66_150);
        ring.push(&vec![0.0; 66_150]);

        // 22050 * 0.75 = 16537.5, rounds to 16538
        let segment = extract_segment(&ring, 22_050, 0.75).unwrap();
        assert_eq!(segment.len(), 16_538);
    }

    #[test]
    fn test_extract_window_exceeding_capacity_fails() {
        let ring = SampleRing::new(100);
        ring.push(&[0.0; 100]);

        let result = extract_segment(&ring, 1000, 0.5);
        assert!(matches!(
            result,
            Err(ChordscopeError::InsufficientCapacity { .. })
        ));
    }
}
