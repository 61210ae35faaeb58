//! Triage algorithms
//!
//! Leaves first: the severity model and threshold rules, the generators
//! built on them, the feature encoders, the classifier, and the decision
//! engine that consumes its output.

pub mod decision;
pub mod encoder;
pub mod forest;
pub mod rules;
pub mod secondary;
pub mod severity;
pub mod synth;

pub use decision::Decision;
pub use encoder::{CategoryEncoder, FeatureEncoder, GenderEncoder, SymptomEncoder};
pub use forest::{RandomForest, TriageClassifier};
pub use rules::{Explanation, Reason, THRESHOLDS};
pub use synth::SyntheticGenerator;
