//! Training and inference row model
//!
//! A [`TriageRecord`] is one row of the training corpus. Its field order
//! matches the corpus column contract in [`crate::schema`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical gender values produced by the generators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    /// "Male"
    Male,
    /// "Female"
    Female,
}

impl Gender {
    /// Both canonical values, in generation order
    pub const ALL: [Self; 2] = [Self::Male, Self::Female];

    /// Extra label fitted into the gender encoder so the code space does not
    /// depend on which genders a particular corpus happens to contain
    pub const RESERVED_LABEL: &'static str = "Other";

    /// Literal used in the corpus
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
        }
    }

    /// Parse an exact canonical literal; anything else is `None`
    #[must_use]
    pub fn from_canonical(value: &str) -> Option<Self> {
        match value {
            "Male" => Some(Self::Male),
            "Female" => Some(Self::Female),
            _ => None,
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw vital signs used by escalation and explanation rules
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    /// Body temperature in °C
    pub temperature: f64,
    /// Heart rate in beats per minute
    pub heart_rate: f64,
    /// Oxygen saturation in %
    pub spo2: f64,
    /// Systolic blood pressure in mmHg
    pub systolic_bp: f64,
}

/// One labeled corpus row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageRecord {
    /// Age in years
    pub age: i32,
    /// Gender literal, canonically "Male" or "Female"
    pub gender: String,
    /// Primary symptom
    pub symptom: String,
    /// Body temperature in °C, one decimal
    pub temperature: f64,
    /// Heart rate in bpm
    pub heart_rate: i32,
    /// Oxygen saturation in %, within [60, 100]
    pub spo2: f64,
    /// Systolic blood pressure in mmHg
    pub systolic_bp: i32,
    /// Label, 1 (most critical) to 5 (least urgent)
    pub triage_level: i32,
}

impl TriageRecord {
    /// Vital signs of this row
    #[must_use]
    pub fn vitals(&self) -> Vitals {
        Vitals {
            temperature: self.temperature,
            heart_rate: f64::from(self.heart_rate),
            spo2: self.spo2,
            systolic_bp: f64::from(self.systolic_bp),
        }
    }
}
