use std::io::Write;

use triage_ml::algorithm::severity::DEFAULT_SYMPTOM;
use triage_ml::{
    ArtifactPaths, ModelArtifacts, SecondaryConfig, TriageError, TriageResponse, predict_from_dir, read_corpus,
};

use crate::utils::{fast_training_config, request, shared_model, train_into};

/// Unknown symptom falls back to the default and still gets an assessment
#[test]
fn test_unknown_symptom_end_to_end() {
    let model = shared_model();
    let request = request(30, "Male", &["Fever"], Some(38.0), Some(95.0), Some("120/80"));

    let response = predict_from_dir(&model.paths, &request);
    let assessment = response.assessment().expect("assessment, not an error");

    assert!((1..=5).contains(&assessment.ml_level));
    assert!([95, 85, 65, 40, 15].contains(&assessment.score));
    assert!(["Critical", "Urgent", "Semi-Urgent", "Routine"].contains(&assessment.level.as_str()));
    assert!(assessment.explanation.contains(&format!("Symptom: {DEFAULT_SYMPTOM}")));
    assert_eq!(assessment.explanation, "Symptom: Headache");
}

#[test]
fn test_corpus_follows_contract() {
    let records = read_corpus(&shared_model().corpus).unwrap();
    assert_eq!(records.len(), 600);
    for record in &records {
        assert!((1..=5).contains(&record.triage_level));
        assert!((60.0..=100.0).contains(&record.spo2));
    }
}

#[test]
fn test_artifacts_load_with_full_vocabulary() {
    let artifacts = ModelArtifacts::load(&shared_model().paths).unwrap();
    let classes = artifacts.encoder.gender.inner().classes();
    assert_eq!(classes, &["Female", "Male", "Other"]);
    assert!(artifacts.encoder.symptom.inner().contains(DEFAULT_SYMPTOM));
    assert!(!artifacts.encoder.symptom.inner().contains("Fever"));
    assert_eq!(artifacts.classifier.trees().len(), 20);
}

#[test]
fn test_critical_presentation_explanation() {
    let request = request(
        60,
        "Female",
        &["Chest Pain", "Cough"],
        Some(40.0),
        Some(85.0),
        Some("170/100"),
    );
    let response = predict_from_dir(&shared_model().paths, &request);
    let explanation = &response.assessment().unwrap().explanation;
    assert_eq!(
        explanation,
        "Critical SpO2 (85%); High Fever (40°C); Hypertension (BP 170); Critical Symptom: Chest Pain"
    );
}

#[test]
fn test_training_with_secondary_dataset() {
    let dir = tempfile::tempdir().unwrap();
    let secondary = dir.path().join("emergency.csv");
    let mut file = std::fs::File::create(&secondary).unwrap();
    writeln!(file, "Patient Id,Patient Gender,Patient Age,Patient Admission Flag").unwrap();
    for i in 0..40 {
        let gender = if i % 2 == 0 { "M" } else { "F" };
        let admitted = if i % 3 == 0 { "True" } else { "False" };
        writeln!(file, "{i},{gender},{},{admitted}", 20 + i).unwrap();
    }
    drop(file);

    let (paths, _) = train_into(dir.path(), Some(secondary));
    let request = request(45, "Other", &[], None, None, None);
    assert!(!predict_from_dir(&paths, &request).is_error());
}

#[test]
fn test_broken_secondary_dataset_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let secondary = dir.path().join("emergency.csv");
    std::fs::write(&secondary, "unexpected,columns\n1,2\n").unwrap();

    let corpus = dir.path().join("triage_dataset.csv");
    let config = triage_ml::GeneratorConfig {
        rows: 200,
        ..Default::default()
    };
    triage_ml::generate_corpus(&config, &corpus).unwrap();

    let report = triage_ml::train(
        &corpus,
        &SecondaryConfig {
            path: Some(secondary),
            seed: Some(1),
        },
        &fast_training_config(),
        &ArtifactPaths::new(dir.path().join("model")),
    )
    .unwrap();

    assert_eq!(report.secondary_rows, 0);
    assert_eq!(report.primary_rows, 200);
    assert_eq!(report.train_rows + report.test_rows, 200);
    assert!(report.accuracy.is_some());
}

#[test]
fn test_missing_primary_corpus_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let result = triage_ml::train(
        &dir.path().join("triage_dataset.csv"),
        &SecondaryConfig::default(),
        &fast_training_config(),
        &ArtifactPaths::new(dir.path().join("model")),
    );
    assert!(matches!(result, Err(TriageError::NoTrainingData { .. })));
    assert!(!dir.path().join("model").exists());
}

#[test]
fn test_response_is_never_mixed() {
    let response = predict_from_dir(&shared_model().paths, &request(5, "", &[], None, None, Some("bad")));
    let json = serde_json::to_value(&response).unwrap();
    match response {
        TriageResponse::Assessment(_) => {
            assert!(json.get("error").is_none());
            for key in ["score", "level", "ml_level", "explanation"] {
                assert!(json.get(key).is_some(), "missing {key}");
            }
        }
        TriageResponse::Error { .. } => panic!("unexpected error response: {json}"),
    }
}
