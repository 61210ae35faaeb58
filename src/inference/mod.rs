//! Inference boundary
//!
//! The functions here never fail: every error, from a missing artifact to a
//! malformed request, is reduced to [`TriageResponse::Error`]. Artifacts are
//! loaded fresh per call unless the caller keeps a [`Predictor`].

use std::sync::Arc;

use crate::algorithm::decision::Decision;
use crate::algorithm::forest::TriageClassifier;
use crate::artifacts::ModelArtifacts;
use crate::config::ArtifactPaths;
use crate::error::{Result, TriageError};
use crate::models::{TriageAssessment, TriageRequest, TriageResponse};

const SERIALIZATION_FAILURE: &str = r#"{"error":"failed to serialize response"}"#;

/// Assess one request with already loaded artifacts
pub fn predict(request: &TriageRequest, artifacts: &ModelArtifacts) -> Result<TriageAssessment> {
    let encoded = artifacts.encoder.encode_request(request)?;
    if encoded.symptom.fell_back {
        log::debug!(
            "Request symptom {:?} not in the vocabulary; using {}",
            request.symptoms.first(),
            encoded.symptom.name
        );
    }

    let ml_level = artifacts
        .classifier
        .predict_one(&encoded.features.to_vector())?;
    Ok(Decision::for_request(ml_level, &encoded).into_assessment())
}

fn into_response(result: Result<TriageAssessment>) -> TriageResponse {
    match result {
        Ok(assessment) => TriageResponse::Assessment(assessment),
        Err(e) => {
            log::warn!("Triage request failed: {e}");
            TriageResponse::Error {
                error: e.to_string(),
            }
        }
    }
}

/// Load the artifacts from `paths` and assess one request
#[must_use]
pub fn predict_from_dir(paths: &ArtifactPaths, request: &TriageRequest) -> TriageResponse {
    into_response(ModelArtifacts::load(paths).and_then(|artifacts| predict(request, &artifacts)))
}

/// Assess a JSON request and return the JSON response
#[must_use]
pub fn predict_json(paths: &ArtifactPaths, raw: &str) -> String {
    let response = match serde_json::from_str::<TriageRequest>(raw) {
        Ok(request) => predict_from_dir(paths, &request),
        Err(e) => into_response(Err(TriageError::Json(e))),
    };
    render(&response)
}

/// Serialize a response; falls back to a fixed error object
#[must_use]
pub fn render(response: &TriageResponse) -> String {
    serde_json::to_string(response).unwrap_or_else(|_| SERIALIZATION_FAILURE.to_string())
}

/// Loaded artifacts kept for the life of the process.
///
/// Read-only after load, so one instance may serve many threads.
#[derive(Debug, Clone)]
pub struct Predictor {
    artifacts: Arc<ModelArtifacts>,
}

impl Predictor {
    /// Load the artifacts once
    pub fn load(paths: &ArtifactPaths) -> Result<Self> {
        Ok(Self::from_artifacts(ModelArtifacts::load(paths)?))
    }

    /// Wrap artifacts that are already in memory
    #[must_use]
    pub fn from_artifacts(artifacts: ModelArtifacts) -> Self {
        Self {
            artifacts: Arc::new(artifacts),
        }
    }

    /// The loaded artifacts
    #[must_use]
    pub fn artifacts(&self) -> &ModelArtifacts {
        &self.artifacts
    }

    /// Assess one request
    #[must_use]
    pub fn respond(&self, request: &TriageRequest) -> TriageResponse {
        into_response(predict(request, &self.artifacts))
    }
}
