//! Persisted model artifacts
//!
//! Three JSON files live in the artifact directory: the fitted classifier,
//! the gender encoder and the symptom encoder. The classifier file also
//! records the feature columns it was trained on and when. Any failure to
//! load one of them is reported as [`TriageError::ArtifactLoad`] naming the
//! offending file.

use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::algorithm::encoder::{FeatureEncoder, GenderEncoder, SymptomEncoder};
use crate::algorithm::forest::RandomForest;
use crate::config::ArtifactPaths;
use crate::error::util::{safe_create_file, safe_open_file};
use crate::error::{Result, TriageError};
use crate::schema::{FEATURE_COLUMNS, ensure_feature_columns};
use crate::utils::logging::{log_operation_complete, log_operation_start};

/// On-disk form of the classifier artifact
#[derive(Debug, Serialize, Deserialize)]
struct ModelFile {
    feature_columns: Vec<String>,
    trained_at: DateTime<Utc>,
    forest: RandomForest,
}

/// A fitted classifier together with the encoders it was trained with
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    /// Fitted classifier
    pub classifier: RandomForest,
    /// Fitted categorical encoders
    pub encoder: FeatureEncoder,
    /// When the classifier was fitted
    pub trained_at: DateTime<Utc>,
}

impl ModelArtifacts {
    /// Bundle freshly fitted artifacts
    #[must_use]
    pub fn new(classifier: RandomForest, encoder: FeatureEncoder) -> Self {
        Self {
            classifier,
            encoder,
            trained_at: Utc::now(),
        }
    }

    /// Write all three artifacts, creating the directory if needed
    pub fn save(&self, paths: &ArtifactPaths) -> Result<()> {
        log_operation_start("Saving model artifacts to", paths.dir());
        let start = Instant::now();

        let model = ModelFile {
            feature_columns: FEATURE_COLUMNS.iter().map(|c| (*c).to_string()).collect(),
            trained_at: self.trained_at,
            forest: self.classifier.clone(),
        };
        write_json(&paths.model(), &model, "classifier artifact")?;
        write_json(&paths.gender_encoder(), &self.encoder.gender, "gender encoder")?;
        write_json(&paths.symptom_encoder(), &self.encoder.symptom, "symptom encoder")?;

        log_operation_complete(
            "saved",
            paths.dir(),
            self.classifier.trees().len(),
            Some(start.elapsed()),
        );
        Ok(())
    }

    /// Load and check all three artifacts
    pub fn load(paths: &ArtifactPaths) -> Result<Self> {
        let model_path = paths.model();
        let model: ModelFile = read_json(&model_path, "classifier artifact")?;
        ensure_feature_columns(&model.feature_columns)
            .map_err(|e| TriageError::artifact_load(&model_path, e))?;
        model
            .forest
            .validate()
            .map_err(|e| TriageError::artifact_load(&model_path, e))?;

        let gender_path = paths.gender_encoder();
        let gender: GenderEncoder = read_json(&gender_path, "gender encoder")?;
        gender
            .validate()
            .map_err(|e| TriageError::artifact_load(&gender_path, e))?;

        let symptom_path = paths.symptom_encoder();
        let symptom: SymptomEncoder = read_json(&symptom_path, "symptom encoder")?;
        symptom
            .validate()
            .map_err(|e| TriageError::artifact_load(&symptom_path, e))?;

        log::debug!(
            "Loaded classifier with {} trees trained at {}",
            model.forest.trees().len(),
            model.trained_at
        );

        Ok(Self {
            classifier: model.forest,
            encoder: FeatureEncoder { gender, symptom },
            trained_at: model.trained_at,
        })
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T, purpose: &str) -> Result<()> {
    let file = safe_create_file(path, purpose)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path, purpose: &str) -> Result<T> {
    let file = safe_open_file(path, purpose).map_err(|e| TriageError::artifact_load(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| TriageError::artifact_load(path, e))
}
