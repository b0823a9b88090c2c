//! Classification and label stabilization.

pub mod classifier;
pub mod energy_gate;
pub mod label;
pub mod stability;

pub use classifier::{Classifier, MockClassifier};
pub use energy_gate::EnergyGatedClassifier;
pub use label::{Label, StableLabel};
pub use stability::{PredictionHistory, StabilityFilter};
