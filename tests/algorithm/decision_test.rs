use triage_ml::algorithm::Decision;
use triage_ml::models::{Category, Vitals, urgency_score};

fn vitals(temperature: f64, spo2: f64, systolic_bp: f64) -> Vitals {
    Vitals {
        temperature,
        heart_rate: 80.0,
        spo2,
        systolic_bp,
    }
}

#[test]
fn test_score_and_category_depend_only_on_level() {
    for (level, score, category) in [
        (1, 95, Category::Critical),
        (2, 85, Category::Critical),
        (3, 65, Category::Urgent),
        (4, 40, Category::SemiUrgent),
        (5, 15, Category::Routine),
        (7, 10, Category::Routine),
        (-1, 10, Category::Routine),
    ] {
        assert_eq!(urgency_score(level), score);
        assert_eq!(Category::from_level(level), category);

        let calm = Decision::new(level, &vitals(37.0, 98.0, 120.0), "Cough");
        let alarming = Decision::new(level, &vitals(41.0, 70.0, 60.0), "Unconscious");
        assert_eq!((calm.score, calm.category), (score, category));
        assert_eq!((alarming.score, alarming.category), (score, category));
    }
}

#[test]
fn test_explanation_order() {
    let assessment = Decision::new(2, &vitals(40.0, 85.0, 170.0), "Chest Pain").into_assessment();
    let expected = ["Critical SpO2", "High Fever", "Hypertension", "Critical Symptom: Chest Pain"];

    let mut cursor = 0;
    for needle in expected {
        let found = assessment.explanation[cursor..]
            .find(needle)
            .unwrap_or_else(|| panic!("{needle} missing or out of order"));
        cursor += found + needle.len();
    }
}

#[test]
fn test_lower_threshold_wins() {
    let assessment = Decision::new(3, &vitals(38.5, 92.0, 85.0), "Vomiting").into_assessment();
    assert_eq!(
        assessment.explanation,
        "Low SpO2 (92%); Fever (38.5°C); Hypotension (BP 85); Symptom: Vomiting"
    );
}
