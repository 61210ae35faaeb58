use triage_ml::config::ArtifactPaths;
use triage_ml::inference::{Predictor, render};
use triage_ml::{predict_from_dir, predict_json};

use crate::utils::{request, shared_model};

const FEVER_REQUEST: &str = r#"{"age":30,"gender":"Male","symptoms":["Fever"],
    "vitals":{"temperature":38,"spo2":95,"bloodPressure":"120/80"}}"#;

/// Copy the shared artifacts so one can be removed
fn copy_artifacts(dir: &std::path::Path) -> ArtifactPaths {
    let source = &shared_model().paths;
    let target = ArtifactPaths::new(dir.join("model"));
    std::fs::create_dir_all(target.dir()).unwrap();
    for (from, to) in [
        (source.model(), target.model()),
        (source.gender_encoder(), target.gender_encoder()),
        (source.symptom_encoder(), target.symptom_encoder()),
    ] {
        std::fs::copy(from, to).unwrap();
    }
    target
}

#[test]
fn test_any_missing_artifact_yields_error_object() {
    for file in [
        ArtifactPaths::MODEL_FILE,
        ArtifactPaths::GENDER_ENCODER_FILE,
        ArtifactPaths::SYMPTOM_ENCODER_FILE,
    ] {
        let dir = tempfile::tempdir().unwrap();
        let paths = copy_artifacts(dir.path());
        std::fs::remove_file(paths.dir().join(file)).unwrap();

        let out = predict_json(&paths, FEVER_REQUEST);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 1, "partial fields in {out}");
        let message = object["error"].as_str().unwrap();
        assert!(message.contains(file), "{message}");
    }
}

#[test]
fn test_json_round_trip() {
    let out = predict_json(&shared_model().paths, FEVER_REQUEST);
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert!(value.get("error").is_none(), "{out}");
    assert_eq!(value["explanation"], "Symptom: Headache");
    assert!(value["score"].as_u64().unwrap() <= 100);
    assert!((1..=5).contains(&value["ml_level"].as_i64().unwrap()));
}

#[test]
fn test_numeric_blood_pressure_falls_back() {
    let numeric = predict_json(
        &shared_model().paths,
        r#"{"age":40,"gender":"Male","symptoms":["Cough"],"vitals":{"bloodPressure":120}}"#,
    );
    let value: serde_json::Value = serde_json::from_str(&numeric).unwrap();
    assert!(value.get("error").is_none(), "{numeric}");
    assert_eq!(value["explanation"], "Symptom: Cough");

    let absent = predict_json(
        &shared_model().paths,
        r#"{"age":40,"gender":"Male","symptoms":["Cough"],"vitals":{}}"#,
    );
    assert_eq!(numeric, absent);
}

#[test]
fn test_missing_vitals_use_defaults() {
    let out = predict_json(&shared_model().paths, r#"{"age":50,"gender":"Female","symptoms":["Cough"]}"#);
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["explanation"], "Symptom: Cough");
}

#[test]
fn test_cached_predictor_matches_fresh_load() {
    let paths = &shared_model().paths;
    let predictor = Predictor::load(paths).unwrap();
    for req in [
        request(30, "Male", &["Fever"], Some(38.0), Some(95.0), Some("120/80")),
        request(82, "Female", &["Stroke Symptoms"], Some(37.2), Some(91.0), Some("85/50")),
        request(0, "Unknown", &[], None, None, None),
    ] {
        assert_eq!(predictor.respond(&req), predict_from_dir(paths, &req));
    }
}

#[test]
fn test_predictor_is_shareable_across_threads() {
    let predictor = Predictor::load(&shared_model().paths).unwrap();
    let req = request(40, "Male", &["Headache"], None, None, None);
    let expected = render(&predictor.respond(&req));

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| assert_eq!(render(&predictor.respond(&req)), expected));
        }
    });
}
