//! Fixed-capacity concurrent ring buffer for captured samples.
//!
//! Single producer (the capture callback), single consumer (the segment
//! extractor). The buffer always holds the most recently written `capacity`
//! samples; older audio is silently overwritten. The consumer only ever
//! wants the most recent window, so losing old audio is fine.

use crate::error::{ChordscopeError, Result};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct RingState {
    storage: Vec<f32>,
    /// Next write position, always in `[0, capacity)`.
    cursor: usize,
    /// Total samples ever pushed, including overwritten ones.
    written: u64,
}

/// Concurrent fixed-capacity sample store.
///
/// All operations take a single lock around storage and cursor, so a push
/// and a read never interleave partially: a reader can never observe a
/// half-written batch spanning the wrap boundary.
#[derive(Debug)]
pub struct SampleRing {
    capacity: usize,
    state: Mutex<RingState>,
}

impl SampleRing {
    /// Creates a ring holding the most recent `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            state: Mutex::new(RingState {
                storage: vec![0.0; capacity],
                cursor: 0,
                written: 0,
            }),
        }
    }

    /// Ring capacity in samples.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total samples ever pushed, including ones already overwritten.
    pub fn written(&self) -> u64 {
        self.lock().written
    }

    fn lock(&self) -> MutexGuard<'_, RingState> {
        // A poisoned lock means a panic mid-push; the sample data is still
        // structurally valid, so recover rather than propagate.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends samples at the write cursor, wrapping at the capacity
    /// boundary and splitting the batch across it when needed.
    ///
    /// A batch longer than the capacity keeps only its trailing `capacity`
    /// samples, but the cursor still advances as if every sample were
    /// written, so subsequent reads stay chronologically consistent.
    pub fn push(&self, samples: &[f32]) {
        let cap = self.capacity;
        if samples.is_empty() || cap == 0 {
            return;
        }
        let mut state = self.lock();

        let keep = if samples.len() > cap {
            &samples[samples.len() - cap..]
        } else {
            samples
        };
        let start = (state.cursor + (samples.len() - keep.len())) % cap;
        let first = keep.len().min(cap - start);
        state.storage[start..start + first].copy_from_slice(&keep[..first]);
        state.storage[..keep.len() - first].copy_from_slice(&keep[first..]);
        state.cursor = (start + keep.len()) % cap;
        state.written += samples.len() as u64;
    }

    /// Returns the most recent `n` samples in chronological order.
    ///
    /// With the cursor at `w`, the result is the contiguous slice `[w-n, w)`
    /// when it fits, otherwise the tail of the storage followed by `[0, w)`.
    ///
    /// # Errors
    /// `InsufficientCapacity` when `n` exceeds the ring capacity;
    /// `InsufficientData` while fewer than `n` samples have ever been pushed.
    pub fn read_last(&self, n: usize) -> Result<Vec<f32>> {
        if n > self.capacity {
            return Err(ChordscopeError::InsufficientCapacity {
                requested: n,
                capacity: self.capacity,
            });
        }
        let state = self.lock();
        if state.written < n as u64 {
            return Err(ChordscopeError::InsufficientData {
                written: state.written,
                requested: n,
            });
        }

        let mut out = Vec::with_capacity(n);
        if state.cursor >= n {
            out.extend_from_slice(&state.storage[state.cursor - n..state.cursor]);
        } else {
            let tail = n - state.cursor;
            out.extend_from_slice(&state.storage[self.capacity - tail..]);
            out.extend_from_slice(&state.storage[..state.cursor]);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequence(range: std::ops::Range<usize>) -> Vec<f32> {
        range.map(|i| i as f32).collect()
    }

    #[test]
    fn test_read_last_returns_pushed_order_before_wrap() {
        let ring = SampleRing::new(10);
        ring.push(&sequence(0..6));

        let samples = ring.read_last(6).unwrap();
        assert_eq!(samples, sequence(0..6));

        let tail = ring.read_last(3).unwrap();
        assert_eq!(tail, sequence(3..6));
    }

    #[test]
    fn test_wraparound_returns_most_recent_samples() {
        let ring = SampleRing::new(10);
        ring.push(&sequence(0..4));
        ring.push(&sequence(4..8));
        ring.push(&sequence(8..12));

        // 12 samples pushed into a 10-slot ring: only the last 10 survive.
        assert_eq!(ring.read_last(10).unwrap(), sequence(2..12));
        assert_eq!(ring.read_last(5).unwrap(), sequence(7..12));
    }

    #[test]
    fn test_result_is_independent_of_chunking() {
        let data = sequence(0..25);
        let chunkings: [&[usize]; 3] = [&[25], &[7, 7, 7, 4], &[1; 25]];

        let mut results = Vec::new();
        for chunking in chunkings {
            let ring = SampleRing::new(8);
            let mut offset = 0;
            for &len in chunking {
                ring.push(&data[offset..offset + len]);
                offset += len;
            }
            results.push(ring.read_last(8).unwrap());
        }

        assert_eq!(results[0], sequence(17..25));
        assert_eq!(results[0], results[1]);
        assert_eq!(results[0], results[2]);
    }

    #[test]
    fn test_lossy_capacity_discards_old_samples() {
        let ring = SampleRing::new(5);
        ring.push(&sequence(0..10));

        assert_eq!(ring.read_last(5).unwrap(), sequence(5..10));
        // Older samples are unrecoverable: a bigger read errors out rather
        // than resurrecting them.
        assert!(matches!(
            ring.read_last(6),
            Err(ChordscopeError::InsufficientCapacity {
                requested: 6,
                capacity: 5
            })
        ));
    }

    #[test]
    fn test_oversized_push_keeps_trailing_samples_and_cursor() {
        let ring = SampleRing::new(4);
        ring.push(&sequence(0..10));
        assert_eq!(ring.read_last(4).unwrap(), sequence(6..10));

        // The cursor advanced as if all 10 were written, so a follow-up
        // push continues seamlessly.
        ring.push(&[10.0, 11.0]);
        assert_eq!(ring.read_last(4).unwrap(), sequence(8..12));
    }

    #[test]
    fn test_read_more_than_written_is_insufficient_data() {
        let ring = SampleRing::new(10);
        ring.push(&sequence(0..3));

        assert!(matches!(
            ring.read_last(5),
            Err(ChordscopeError::InsufficientData {
                written: 3,
                requested: 5
            })
        ));
        assert_eq!(ring.read_last(3).unwrap(), sequence(0..3));
    }

    #[test]
    fn test_read_zero_samples_is_always_ok() {
        let ring = SampleRing::new(4);
        assert_eq!(ring.read_last(0).unwrap(), Vec::<f32>::new());
    }

    #[test]
    fn test_empty_push_is_a_noop() {
        let ring = SampleRing::new(4);
        ring.push(&[]);
        assert_eq!(ring.written(), 0);
    }

    #[test]
    fn test_written_counts_overwritten_samples() {
        let ring = SampleRing::new(4);
        ring.push(&sequence(0..3));
        ring.push(&sequence(3..9));
        assert_eq!(ring.written(), 9);
    }

    #[test]
    fn test_push_exactly_at_capacity_boundary() {
        let ring = SampleRing::new(6);
        ring.push(&sequence(0..6));
        assert_eq!(ring.read_last(6).unwrap(), sequence(0..6));

        ring.push(&sequence(6..12));
        assert_eq!(ring.read_last(6).unwrap(), sequence(6..12));
    }

    #[test]
    fn test_concurrent_push_and_read() {
        use std::sync::Arc;

        let ring = Arc::new(SampleRing::new(1024));
        let producer_ring = Arc::clone(&ring);
        let producer = std::thread::spawn(move || {
            for i in 0..200u32 {
                let chunk: Vec<f32> = (0..64).map(|j| (i * 64 + j) as f32).collect();
                producer_ring.push(&chunk);
            }
        });

        // Reads during concurrent writes must always be a chronologically
        // consistent run of consecutive values.
        for _ in 0..50 {
            if let Ok(samples) = ring.read_last(256) {
                for pair in samples.windows(2) {
                    assert_eq!(pair[1] - pair[0], 1.0, "non-consecutive samples: {pair:?}");
                }
            }
        }

        producer.join().unwrap();
        assert_eq!(ring.written(), 200 * 64);
    }
}
