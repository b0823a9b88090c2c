//! Majority-vote debouncing of raw per-tick verdicts.
//!
//! Raw labels flicker: a strummed chord decays through ambiguous frames,
//! and the model disagrees with itself at window boundaries. The filter
//! publishes a new label only once recent history agrees on it, with a
//! lower bar for entering silence than for entering a chord so that decay
//! tails do not pin a stale chord on screen.

use crate::classify::label::{Label, StableLabel};
use crate::defaults;

/// Fixed-capacity ring of the most recent raw labels, oldest first.
#[derive(Debug, Clone)]
pub struct PredictionHistory {
    slots: Vec<Label>,
    head: usize,
    capacity: usize,
}

impl PredictionHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            head: 0,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() == self.capacity
    }

    /// Record a label, evicting the oldest once at capacity.
    pub fn push(&mut self, label: Label) {
        if self.slots.len() < self.capacity {
            self.slots.push(label);
        } else {
            self.slots[self.head] = label;
            self.head = (self.head + 1) % self.capacity;
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.head = 0;
    }

    /// Iterate labels oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        self.slots[self.head..]
            .iter()
            .chain(self.slots[..self.head].iter())
    }

    /// Most frequent label and its count. Ties go to the label seen
    /// earliest in the history. History sizes are single digit, so the
    /// quadratic scan is fine.
    pub fn majority(&self) -> Option<(&Label, usize)> {
        let mut best: Option<(&Label, usize)> = None;
        for candidate in self.iter() {
            let count = self.iter().filter(|l| *l == candidate).count();
            match best {
                Some((_, best_count)) if best_count >= count => {}
                _ => best = Some((candidate, count)),
            }
        }
        best
    }
}

/// Debouncer that turns the raw label stream into a [`StableLabel`].
///
/// A full history is required before any transition. Silence takes over
/// once all but one recent verdict agree; a chord needs every verdict to
/// agree. `Unknown` verdicts are dropped and do not age the history.
#[derive(Debug, Clone)]
pub struct StabilityFilter {
    history: PredictionHistory,
    stable: StableLabel,
}

impl StabilityFilter {
    pub fn new() -> Self {
        Self::with_capacity(defaults::HISTORY_LEN)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            history: PredictionHistory::new(capacity),
            stable: StableLabel::AwaitingInput,
        }
    }

    /// Current debounced label.
    pub fn stable(&self) -> &StableLabel {
        &self.stable
    }

    /// Drop all history and go back to the initial state.
    pub fn reset(&mut self) {
        self.reset_to(StableLabel::AwaitingInput);
    }

    /// Drop all history and pin the given stable label.
    pub fn reset_to(&mut self, stable: StableLabel) {
        self.history.clear();
        self.stable = stable;
    }

    /// Feed one raw verdict. Returns the new stable label when this tick
    /// caused a transition, None otherwise.
    pub fn update(&mut self, label: Label) -> Option<StableLabel> {
        if label == Label::Unknown {
            return None;
        }
        self.history.push(label);
        if !self.history.is_full() {
            return None;
        }

        let k = self.history.capacity();
        let (majority, count) = self.history.majority()?;
        let candidate = match majority {
            Label::Silence if count >= k.saturating_sub(1) => StableLabel::Silence,
            Label::Chord(name) if count >= k => StableLabel::Chord(name.clone()),
            _ => return None,
        };

        if candidate != self.stable {
            self.stable = candidate.clone();
            Some(candidate)
        } else {
            None
        }
    }
}

impl Default for StabilityFilter {
    fn default() -> Self {
        Self::new()
    }
}
