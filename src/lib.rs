//! Emergency triage decision pipeline: synthetic corpus generation, a shared
//! feature-encoding contract, random forest training, and a never-failing
//! inference boundary with rule-based explanations.

pub mod algorithm;
pub mod artifacts;
pub mod config;
pub mod dataset;
pub mod error;
pub mod inference;
pub mod models;
pub mod schema;
pub mod training;
pub mod utils;

// Re-export the most common types for easier use
// Core types
pub use config::{ArtifactPaths, GeneratorConfig, SecondaryConfig, TrainingConfig};
pub use error::{Result, TriageError};
pub use models::{Category, TriageAssessment, TriageLevel, TriageRecord, TriageRequest, TriageResponse};
pub use schema::{FEATURE_COLUMNS, FeatureRow, SchemaCompatibilityReport, SchemaIssue};

// Pipeline stages
pub use algorithm::{Decision, FeatureEncoder, RandomForest, SyntheticGenerator, TriageClassifier};
pub use artifacts::ModelArtifacts;
pub use dataset::{DatasetBuilder, generate_corpus, read_corpus, write_corpus};
pub use training::{TrainingReport, train};

// Inference boundary
pub use inference::{Predictor, predict, predict_from_dir, predict_json};
