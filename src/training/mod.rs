//! One-shot training pipeline
//!
//! Reads the primary corpus, appends the optional secondary corpus, fits
//! the encoders over the merged rows, holds out a seeded test split, fits
//! the forest on the rest and saves the three artifacts.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use rand::prelude::*;
use rand::rngs::StdRng;

use crate::algorithm::encoder::FeatureEncoder;
use crate::algorithm::forest::{RandomForest, TriageClassifier};
use crate::algorithm::secondary::load_secondary;
use crate::artifacts::ModelArtifacts;
use crate::config::{ArtifactPaths, SecondaryConfig, TrainingConfig};
use crate::dataset::{Corpus, DatasetBuilder, read_corpus};
use crate::error::{Result, TriageError};
use crate::schema::FeatureVector;
use crate::utils::logging::log_stage;

const STAGES: usize = 5;

/// Outcome of a training run
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    /// Rows from the primary corpus
    pub primary_rows: usize,
    /// Rows derived from the secondary dataset
    pub secondary_rows: usize,
    /// Rows the forest was fitted on
    pub train_rows: usize,
    /// Rows held out for scoring
    pub test_rows: usize,
    /// Accuracy on the held-out rows; `None` without a test split
    pub accuracy: Option<f64>,
    /// When the forest was fitted
    pub trained_at: DateTime<Utc>,
    /// Where the artifacts were written
    pub artifact_dir: PathBuf,
}

impl fmt::Display for TrainingReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Training Report:")?;
        writeln!(
            f,
            "  Rows: {} ({} synthetic, {} secondary)",
            self.primary_rows + self.secondary_rows,
            self.primary_rows,
            self.secondary_rows
        )?;
        writeln!(f, "  Split: {} train / {} test", self.train_rows, self.test_rows)?;
        match self.accuracy {
            Some(accuracy) => writeln!(f, "  Accuracy: {accuracy:.4}")?,
            None => writeln!(f, "  Accuracy: not measured")?,
        }
        writeln!(f, "  Trained At: {}", self.trained_at.to_rfc3339())?;
        writeln!(f, "  Artifacts: {}", self.artifact_dir.display())?;
        Ok(())
    }
}

/// Shuffle row indices and cut off the held-out part.
///
/// The test part gets `ceil(n * test_fraction)` rows. The training part is
/// never empty.
pub fn train_test_split(
    n_rows: usize,
    test_fraction: f64,
    seed: Option<u64>,
) -> Result<(Vec<usize>, Vec<usize>)> {
    let n_test = (n_rows as f64 * test_fraction).ceil() as usize;
    if n_test >= n_rows {
        return Err(TriageError::Config(format!(
            "test fraction {test_fraction} leaves no training rows out of {n_rows}"
        )));
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let mut indices: Vec<usize> = (0..n_rows).collect();
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_test);
    Ok((train, indices))
}

/// Artifacts fitted on a corpus, with their held-out score
#[derive(Debug, Clone)]
pub struct FittedModel {
    /// Classifier and encoders
    pub artifacts: ModelArtifacts,
    /// Rows the forest was fitted on
    pub train_rows: usize,
    /// Rows held out for scoring
    pub test_rows: usize,
    /// Accuracy on the held-out rows; `None` without a test split
    pub accuracy: Option<f64>,
}

/// Fit encoders and classifier on a merged corpus
pub fn fit_corpus(corpus: &Corpus, config: &TrainingConfig) -> Result<FittedModel> {
    config.validate()?;

    let encoder = FeatureEncoder::fit(&corpus.records)?;
    let features: Vec<FeatureVector> = corpus
        .records
        .iter()
        .map(|record| encoder.encode_record(record).map(|row| row.to_vector()))
        .collect::<Result<_>>()?;
    let labels: Vec<i32> = corpus.records.iter().map(|r| r.triage_level).collect();

    let (train, test) = train_test_split(features.len(), config.test_fraction, config.seed)?;
    let pick = |indices: &[usize]| -> (Vec<FeatureVector>, Vec<i32>) {
        indices.iter().map(|&i| (features[i], labels[i])).unzip()
    };
    let (x_train, y_train) = pick(&train);
    let (x_test, y_test) = pick(&test);

    let mut forest = RandomForest::new(config.forest, config.seed)
        .with_n_jobs(config.n_jobs)
        .with_progress(config.show_progress);
    forest.fit(&x_train, &y_train)?;

    let accuracy = if x_test.is_empty() {
        None
    } else {
        Some(forest.score(&x_test, &y_test)?)
    };

    Ok(FittedModel {
        artifacts: ModelArtifacts::new(forest, encoder),
        train_rows: train.len(),
        test_rows: test.len(),
        accuracy,
    })
}

/// Run the whole pipeline and save the artifacts
///
/// # Arguments
/// * `corpus_path` - Primary synthetic corpus; its absence aborts training
/// * `secondary` - Optional secondary dataset; failures only log a warning
/// * `config` - Split and forest settings
/// * `paths` - Where to write the artifacts
pub fn train(
    corpus_path: &Path,
    secondary: &SecondaryConfig,
    config: &TrainingConfig,
    paths: &ArtifactPaths,
) -> Result<TrainingReport> {
    let start = Instant::now();
    log::info!("{config}");

    log_stage(1, STAGES, "Loading primary corpus");
    let primary = read_corpus(corpus_path)?;
    if primary.is_empty() {
        return Err(TriageError::NoTrainingData {
            path: corpus_path.to_path_buf(),
        });
    }

    log_stage(2, STAGES, "Loading secondary dataset");
    let secondary_rows = load_secondary(secondary);

    log_stage(3, STAGES, "Merging corpora");
    let corpus = DatasetBuilder::new(primary)
        .with_secondary(secondary_rows)
        .build()?;
    log::info!("Corpus: {corpus}");

    log_stage(4, STAGES, "Fitting encoders and classifier");
    let fitted = fit_corpus(&corpus, config)?;
    match fitted.accuracy {
        Some(accuracy) => log::info!("Held-out accuracy: {accuracy:.4}"),
        None => log::info!("No held-out rows; accuracy not measured"),
    }

    log_stage(5, STAGES, "Saving artifacts");
    fitted.artifacts.save(paths)?;

    log::info!("Training finished in {:?}", start.elapsed());
    Ok(TrainingReport {
        primary_rows: corpus.primary_rows,
        secondary_rows: corpus.secondary_rows,
        train_rows: fitted.train_rows,
        test_rows: fitted.test_rows,
        accuracy: fitted.accuracy,
        trained_at: fitted.artifacts.trained_at,
        artifact_dir: paths.dir().to_path_buf(),
    })
}
