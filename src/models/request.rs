//! Inference request and response shapes

use serde::{Deserialize, Deserializer, Serialize};

/// Temperature assumed when the request omits it (°C)
pub const DEFAULT_TEMPERATURE: f64 = 37.0;
/// SpO2 assumed when the request omits it (%)
pub const DEFAULT_SPO2: f64 = 98.0;
/// Systolic pressure assumed when blood pressure is absent or unparseable
pub const DEFAULT_SYSTOLIC_BP: i32 = 120;

/// Vitals as submitted by the caller; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestVitals {
    /// Body temperature in °C
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Oxygen saturation in %
    #[serde(default)]
    pub spo2: Option<f64>,
    /// Blood pressure as "SYS/DIA"; a non-string value reads as absent
    #[serde(default, deserialize_with = "lenient_string")]
    pub blood_pressure: Option<String>,
}

impl RequestVitals {
    /// Temperature, or the documented default
    #[must_use]
    pub fn temperature_or_default(&self) -> f64 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    /// SpO2, or the documented default
    #[must_use]
    pub fn spo2_or_default(&self) -> f64 {
        self.spo2.unwrap_or(DEFAULT_SPO2)
    }

    /// Systolic pressure parsed from the "SYS/DIA" string.
    ///
    /// Falls back to 120 when the field is absent, has no `/`, or the
    /// systolic part is not an integer.
    #[must_use]
    pub fn systolic_bp_or_default(&self) -> i32 {
        self.blood_pressure
            .as_deref()
            .and_then(parse_systolic)
            .unwrap_or(DEFAULT_SYSTOLIC_BP)
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        _ => None,
    })
}

fn parse_systolic(raw: &str) -> Option<i32> {
    let (systolic, _) = raw.split_once('/')?;
    systolic.trim().parse().ok()
}

/// A triage request for one patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageRequest {
    /// Age in years
    pub age: i32,
    /// Gender literal; anything but "Male"/"Female" gets the default code
    #[serde(default)]
    pub gender: String,
    /// Reported symptoms; only the first one is used
    #[serde(default)]
    pub symptoms: Vec<String>,
    /// Measured vitals
    #[serde(default)]
    pub vitals: RequestVitals,
}

/// A successful triage decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageAssessment {
    /// Display score, 0-100
    pub score: u8,
    /// Category label
    pub level: String,
    /// Raw classifier level
    pub ml_level: i32,
    /// Semicolon-joined reasons
    pub explanation: String,
}

/// Response of the inference boundary: either an assessment or an error,
/// never a mix of both
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TriageResponse {
    /// Successful decision
    Assessment(TriageAssessment),
    /// Any failure, reduced to a message
    Error {
        /// What went wrong
        error: String,
    },
}

impl TriageResponse {
    /// Whether this is an error response
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// The assessment, if the request succeeded
    #[must_use]
    pub const fn assessment(&self) -> Option<&TriageAssessment> {
        match self {
            Self::Assessment(assessment) => Some(assessment),
            Self::Error { .. } => None,
        }
    }
}
