use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use tempfile::TempDir;
use triage_ml::models::RequestVitals;
use triage_ml::{ArtifactPaths, GeneratorConfig, SecondaryConfig, TrainingConfig, TriageRequest};

/// A trained model shared by every test that only reads it
pub struct TrainedModel {
    _dir: TempDir,
    pub paths: ArtifactPaths,
    pub corpus: PathBuf,
}

static SHARED_MODEL: LazyLock<TrainedModel> = LazyLock::new(|| {
    let dir = tempfile::tempdir().expect("temp dir");
    let (paths, corpus) = train_into(dir.path(), None);
    TrainedModel {
        _dir: dir,
        paths,
        corpus,
    }
});

/// The shared trained model
#[must_use]
pub fn shared_model() -> &'static TrainedModel {
    &SHARED_MODEL
}

/// Small, fast training settings
#[must_use]
pub fn fast_training_config() -> TrainingConfig {
    TrainingConfig::builder()
        .n_estimators(20)
        .n_jobs(2)
        .seed(Some(42))
        .show_progress(false)
        .build()
        .expect("valid config")
}

/// Generate a corpus in `dir` and train into `dir/model`
pub fn train_into(dir: &Path, secondary: Option<PathBuf>) -> (ArtifactPaths, PathBuf) {
    let corpus = dir.join("triage_dataset.csv");
    let config = GeneratorConfig {
        rows: 600,
        ..GeneratorConfig::default()
    };
    triage_ml::generate_corpus(&config, &corpus).expect("corpus generated");

    let paths = ArtifactPaths::new(dir.join("model"));
    let secondary = SecondaryConfig {
        path: secondary,
        seed: Some(43),
    };
    triage_ml::train(&corpus, &secondary, &fast_training_config(), &paths).expect("model trained");
    (paths, corpus)
}

/// Build a request
#[must_use]
pub fn request(
    age: i32,
    gender: &str,
    symptoms: &[&str],
    temperature: Option<f64>,
    spo2: Option<f64>,
    blood_pressure: Option<&str>,
) -> TriageRequest {
    TriageRequest {
        age,
        gender: gender.to_string(),
        symptoms: symptoms.iter().map(|s| (*s).to_string()).collect(),
        vitals: RequestVitals {
            temperature,
            spo2,
            blood_pressure: blood_pressure.map(str::to_string),
        },
    }
}
