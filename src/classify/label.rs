//! Label types produced by classification and stabilization.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw per-tick verdict from the classifier.
///
/// One of these is produced every tick; most are discarded by the
/// stability filter before anything is published.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    /// Segment energy below the silence threshold, or the model said so.
    Silence,
    /// A recognized chord, e.g. "Am" or "G7".
    Chord(String),
    /// No usable verdict this tick (buffer warming up). Skipped by the
    /// stability filter rather than recorded.
    Unknown,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Silence => write!(f, "silence"),
            Label::Chord(name) => write!(f, "{}", name),
            Label::Unknown => write!(f, "unknown"),
        }
    }
}

/// Debounced label as published to observers.
///
/// Only changes when the stability filter accumulates enough agreeing
/// raw verdicts, so readers never see per-tick flicker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StableLabel {
    /// No session has run yet.
    AwaitingInput,
    /// Session running, nothing stable yet.
    Listening,
    Silence,
    Chord(String),
}

impl fmt::Display for StableLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StableLabel::AwaitingInput => write!(f, "waiting for audio"),
            StableLabel::Listening => write!(f, "listening..."),
            StableLabel::Silence => write!(f, "silence..."),
            StableLabel::Chord(name) => write!(f, "{}", name),
        }
    }
}
