//! Column contracts shared by training and inference.
//!
//! Two contracts live here and nowhere else:
//!
//! * the corpus schema: the eight columns of a training file, in order;
//! * the feature schema: the seven model inputs, in order.
//!
//! Both the training loop and the inference path build model inputs through
//! [`FeatureRow::to_vector`], so the feature order cannot drift between them.

use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TriageError};

/// Corpus columns, in file order
pub const CORPUS_COLUMNS: [&str; 8] = [
    "age",
    "gender",
    "symptom",
    "temperature",
    "heart_rate",
    "spo2",
    "systolic_bp",
    "triage_level",
];

/// Name of the label column
pub const LABEL_COLUMN: &str = "triage_level";

/// Model input columns, in vector order
pub const FEATURE_COLUMNS: [&str; N_FEATURES] = [
    "age",
    "gender",
    "symptom",
    "temperature",
    "heart_rate",
    "spo2",
    "systolic_bp",
];

/// Number of model inputs
pub const N_FEATURES: usize = 7;

/// A model input vector, ordered as [`FEATURE_COLUMNS`]
pub type FeatureVector = [f64; N_FEATURES];

/// Get the Arrow schema for the training corpus
#[must_use]
pub fn corpus_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("age", DataType::Int32, false),
        Field::new("gender", DataType::Utf8, false),
        Field::new("symptom", DataType::Utf8, false),
        Field::new("temperature", DataType::Float64, false),
        Field::new("heart_rate", DataType::Int32, false),
        Field::new("spo2", DataType::Float64, false),
        Field::new("systolic_bp", DataType::Int32, false),
        Field::new("triage_level", DataType::Int32, false),
    ]))
}

/// One encoded model input, with named fields
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    /// Age in years
    pub age: f64,
    /// Code from the gender encoder
    pub gender_code: u32,
    /// Code from the symptom encoder
    pub symptom_code: u32,
    /// Body temperature in °C
    pub temperature: f64,
    /// Heart rate in bpm
    pub heart_rate: f64,
    /// Oxygen saturation in %
    pub spo2: f64,
    /// Systolic blood pressure in mmHg
    pub systolic_bp: f64,
}

impl FeatureRow {
    /// Flatten into the model input vector, ordered as [`FEATURE_COLUMNS`]
    #[must_use]
    pub fn to_vector(&self) -> FeatureVector {
        [
            self.age,
            f64::from(self.gender_code),
            f64::from(self.symptom_code),
            self.temperature,
            self.heart_rate,
            self.spo2,
            self.systolic_bp,
        ]
    }
}

/// A struct that represents how a file's columns compare to the corpus contract
#[derive(Debug)]
pub struct SchemaCompatibilityReport {
    /// Whether the columns match exactly
    pub compatible: bool,
    /// List of incompatibility issues, if any
    pub issues: Vec<SchemaIssue>,
}

/// A single column mismatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIssue {
    /// Zero-based column position
    pub position: usize,
    /// Column name required by the contract, if any at this position
    pub expected: Option<String>,
    /// Column name found in the file, if any at this position
    pub found: Option<String>,
}

/// Compare a list of column names against an expected contract, position by position
#[must_use]
pub fn check_columns<S: AsRef<str>>(found: &[S], expected: &[&str]) -> SchemaCompatibilityReport {
    let width = found.len().max(expected.len());
    let issues: Vec<SchemaIssue> = (0..width)
        .filter_map(|position| {
            let found = found.get(position).map(|s| s.as_ref().trim());
            let expected = expected.get(position).copied();
            (found != expected).then(|| SchemaIssue {
                position,
                expected: expected.map(str::to_string),
                found: found.map(str::to_string),
            })
        })
        .collect();

    SchemaCompatibilityReport {
        compatible: issues.is_empty(),
        issues,
    }
}

/// Fail unless the columns are exactly the corpus columns, in order
pub fn ensure_corpus_columns<S: AsRef<str>>(found: &[S]) -> Result<()> {
    ensure_columns(found, &CORPUS_COLUMNS, "corpus")
}

/// Fail unless the columns are exactly the feature columns, in order
pub fn ensure_feature_columns<S: AsRef<str>>(found: &[S]) -> Result<()> {
    ensure_columns(found, &FEATURE_COLUMNS, "feature")
}

fn ensure_columns<S: AsRef<str>>(found: &[S], expected: &[&str], what: &str) -> Result<()> {
    let report = check_columns(found, expected);
    if report.compatible {
        return Ok(());
    }

    let details = report
        .issues
        .iter()
        .map(|issue| {
            format!(
                "column {}: expected {}, found {}",
                issue.position,
                issue.expected.as_deref().unwrap_or("<none>"),
                issue.found.as_deref().unwrap_or("<none>")
            )
        })
        .collect::<Vec<_>>()
        .join("; ");

    Err(TriageError::Schema(format!("{what} columns do not match the contract: {details}")))
}
