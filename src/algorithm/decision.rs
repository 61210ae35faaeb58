//! Decision & Explanation Engine
//!
//! Turns a classifier level into the caller-facing assessment. Category and
//! score depend on the level alone. The explanation is derived from the raw
//! vitals and the resolved primary symptom through [`THRESHOLDS`], without
//! consulting the classifier.

use crate::algorithm::encoder::EncodedRequest;
use crate::algorithm::rules::{Explanation, THRESHOLDS};
use crate::models::{Category, TriageAssessment, Vitals, urgency_score};

/// Everything the engine derives from one prediction
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// Raw classifier level
    pub ml_level: i32,
    /// Category of the level
    pub category: Category,
    /// Display score of the level
    pub score: u8,
    /// Rule-based reasons
    pub explanation: Explanation,
}

impl Decision {
    /// Decide from a predicted level, raw vitals and the primary symptom
    ///
    /// # Arguments
    /// * `ml_level` - Level returned by the classifier; out-of-range values are tolerated
    /// * `vitals` - Vitals the request was encoded with
    /// * `symptom` - Primary symptom after fallback
    #[must_use]
    pub fn new(ml_level: i32, vitals: &Vitals, symptom: &str) -> Self {
        Self {
            ml_level,
            category: Category::from_level(ml_level),
            score: urgency_score(ml_level),
            explanation: THRESHOLDS.explain(vitals, symptom),
        }
    }

    /// Decide for an encoded request
    #[must_use]
    pub fn for_request(ml_level: i32, encoded: &EncodedRequest) -> Self {
        Self::new(ml_level, &encoded.vitals(), &encoded.symptom.name)
    }

    /// Response shape of the decision
    #[must_use]
    pub fn into_assessment(self) -> TriageAssessment {
        TriageAssessment {
            score: self.score,
            level: self.category.label().to_string(),
            ml_level: self.ml_level,
            explanation: self.explanation.to_string(),
        }
    }
}

impl From<Decision> for TriageAssessment {
    fn from(decision: Decision) -> Self {
        decision.into_assessment()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normal() -> Vitals {
        Vitals {
            temperature: 37.0,
            heart_rate: 80.0,
            spo2: 98.0,
            systolic_bp: 120.0,
        }
    }

    #[test]
    fn test_score_and_category_table() {
        let cases = [
            (1, 95, "Critical"),
            (2, 85, "Critical"),
            (3, 65, "Urgent"),
            (4, 40, "Semi-Urgent"),
            (5, 15, "Routine"),
            (7, 10, "Routine"),
            (0, 10, "Routine"),
        ];
        for (level, score, label) in cases {
            let assessment = Decision::new(level, &normal(), "Cough").into_assessment();
            assert_eq!(assessment.score, score, "level {level}");
            assert_eq!(assessment.level, label, "level {level}");
            assert_eq!(assessment.ml_level, level);
        }
    }

    #[test]
    fn test_explanation_ignores_classifier() {
        let a = Decision::new(1, &normal(), "Headache");
        let b = Decision::new(5, &normal(), "Headache");
        assert_eq!(a.explanation, b.explanation);
        assert_eq!(a.into_assessment().explanation, "Symptom: Headache");
    }

    #[test]
    fn test_critical_explanation() {
        let vitals = Vitals {
            temperature: 40.0,
            heart_rate: 80.0,
            spo2: 85.0,
            systolic_bp: 170.0,
        };
        let assessment: TriageAssessment = Decision::new(1, &vitals, "Chest Pain").into();
        let reasons: Vec<&str> = assessment.explanation.split("; ").collect();
        assert_eq!(reasons.len(), 4);
        assert!(reasons[0].starts_with("Critical SpO2"));
        assert!(reasons[1].starts_with("High Fever"));
        assert!(reasons[2].starts_with("Hypertension"));
        assert_eq!(reasons[3], "Critical Symptom: Chest Pain");
    }
}
