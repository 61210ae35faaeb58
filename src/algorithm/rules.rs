//! Clinical threshold rules
//!
//! The same thresholds serve two purposes: escalating synthetic labels when
//! vitals or age are alarming, and explaining a decision to the caller.
//! Both read from [`THRESHOLDS`], so training-time assumptions and
//! inference-time explanations cannot disagree.

use std::fmt;

use smallvec::SmallVec;

use crate::algorithm::severity;
use crate::models::{TriageLevel, Vitals};

/// Vital sign and age thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// SpO2 below this is critical (%)
    pub spo2_critical: f64,
    /// SpO2 below this is low (%)
    pub spo2_low: f64,
    /// Temperature above this is a high fever (°C)
    pub temperature_high_fever: f64,
    /// Temperature above this is a fever (°C)
    pub temperature_fever: f64,
    /// Systolic pressure above this is hypertension (mmHg)
    pub systolic_hypertension: f64,
    /// Systolic pressure below this is hypotension (mmHg)
    pub systolic_hypotension: f64,
    /// Heart rate above this is severe tachycardia (bpm)
    pub heart_rate_tachycardia: f64,
    /// Patients older than this are escalated
    pub age_elderly: i32,
    /// Patients younger than this are escalated
    pub age_infant: i32,
    /// Age escalation applies only to levels above this one
    pub age_escalation_floor: i32,
}

/// The threshold table shared by escalation and explanation
pub const THRESHOLDS: Thresholds = Thresholds {
    spo2_critical: 90.0,
    spo2_low: 95.0,
    temperature_high_fever: 39.5,
    temperature_fever: 38.0,
    systolic_hypertension: 160.0,
    systolic_hypotension: 90.0,
    heart_rate_tachycardia: 130.0,
    age_elderly: 75,
    age_infant: 1,
    age_escalation_floor: 2,
};

impl Thresholds {
    /// Whether any vital sign alone warrants escalation
    #[must_use]
    pub fn has_alarming_vitals(&self, vitals: &Vitals) -> bool {
        vitals.spo2 < self.spo2_critical
            || vitals.systolic_bp < self.systolic_hypotension
            || vitals.heart_rate > self.heart_rate_tachycardia
            || vitals.temperature > self.temperature_high_fever
    }

    /// Whether the age is at either vulnerable extreme
    #[must_use]
    pub const fn is_vulnerable_age(&self, age: i32) -> bool {
        age > self.age_elderly || age < self.age_infant
    }

    /// Apply the escalation rule to a base level.
    ///
    /// Alarming vitals raise urgency by one level (floor 1). A vulnerable
    /// age then raises it by one more, but only while the level is still
    /// above the age escalation floor.
    #[must_use]
    pub fn escalate(&self, base: TriageLevel, age: i32, vitals: &Vitals) -> TriageLevel {
        let mut level = base;
        if self.has_alarming_vitals(vitals) {
            level = level.escalate();
        }
        if self.is_vulnerable_age(age) && level.value() > self.age_escalation_floor {
            level = level.escalate();
        }
        level
    }

    /// Build the ordered list of reasons for a decision.
    ///
    /// Order is SpO2, temperature, blood pressure, then exactly one symptom
    /// reason. Within each vital only the most severe reason is reported.
    #[must_use]
    pub fn explain(&self, vitals: &Vitals, symptom: &str) -> Explanation {
        let mut reasons = SmallVec::new();

        if vitals.spo2 < self.spo2_critical {
            reasons.push(Reason::CriticalSpo2(vitals.spo2));
        } else if vitals.spo2 < self.spo2_low {
            reasons.push(Reason::LowSpo2(vitals.spo2));
        }

        if vitals.temperature > self.temperature_high_fever {
            reasons.push(Reason::HighFever(vitals.temperature));
        } else if vitals.temperature > self.temperature_fever {
            reasons.push(Reason::Fever(vitals.temperature));
        }

        if vitals.systolic_bp > self.systolic_hypertension {
            reasons.push(Reason::Hypertension(vitals.systolic_bp));
        } else if vitals.systolic_bp < self.systolic_hypotension {
            reasons.push(Reason::Hypotension(vitals.systolic_bp));
        }

        if severity::is_critical_symptom(symptom) {
            reasons.push(Reason::CriticalSymptom(symptom.to_string()));
        } else {
            reasons.push(Reason::Symptom(symptom.to_string()));
        }

        Explanation { reasons }
    }
}

/// One human-readable reason
#[derive(Debug, Clone, PartialEq)]
pub enum Reason {
    /// SpO2 below the critical threshold
    CriticalSpo2(f64),
    /// SpO2 below the low threshold
    LowSpo2(f64),
    /// Temperature above the high fever threshold
    HighFever(f64),
    /// Temperature above the fever threshold
    Fever(f64),
    /// Systolic pressure above the hypertension threshold
    Hypertension(f64),
    /// Systolic pressure below the hypotension threshold
    Hypotension(f64),
    /// Primary symptom is in the critical set
    CriticalSymptom(String),
    /// Any other primary symptom
    Symptom(String),
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CriticalSpo2(spo2) => write!(f, "Critical SpO2 ({spo2}%)"),
            Self::LowSpo2(spo2) => write!(f, "Low SpO2 ({spo2}%)"),
            Self::HighFever(temp) => write!(f, "High Fever ({temp}°C)"),
            Self::Fever(temp) => write!(f, "Fever ({temp}°C)"),
            Self::Hypertension(bp) => write!(f, "Hypertension (BP {bp})"),
            Self::Hypotension(bp) => write!(f, "Hypotension (BP {bp})"),
            Self::CriticalSymptom(name) => write!(f, "Critical Symptom: {name}"),
            Self::Symptom(name) => write!(f, "Symptom: {name}"),
        }
    }
}

/// Ordered reasons behind a decision
#[derive(Debug, Clone, PartialEq)]
pub struct Explanation {
    reasons: SmallVec<[Reason; 4]>,
}

impl Explanation {
    /// The reasons, in report order
    #[must_use]
    pub fn reasons(&self) -> &[Reason] {
        &self.reasons
    }
}

impl fmt::Display for Explanation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, reason) in self.reasons.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{reason}")?;
        }
        Ok(())
    }
}
