//! Configuration for corpus generation, training, and artifact locations.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TriageError};

/// Seed used when none is given
pub const DEFAULT_SEED: u64 = 42;

/// Default location of the primary synthetic corpus
pub const DEFAULT_CORPUS_PATH: &str = "triage_dataset.csv";

/// Environment variable the CLI reads the artifact directory from
pub const MODEL_DIR_ENV: &str = "TRIAGE_MODEL_DIR";

/// Default artifact directory, relative to the working directory
pub const DEFAULT_MODEL_DIR: &str = "model";

/// Configuration for synthetic corpus generation
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Number of rows to generate
    pub rows: usize,
    /// Seed for every random draw; `None` uses OS entropy
    pub seed: Option<u64>,
    /// Youngest generated age (inclusive)
    pub min_age: i32,
    /// Oldest generated age (inclusive)
    pub max_age: i32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            rows: 5000,
            seed: Some(DEFAULT_SEED),
            min_age: 1,
            max_age: 94,
        }
    }
}

impl GeneratorConfig {
    /// Check that the age range is usable
    pub fn validate(&self) -> Result<()> {
        if self.min_age > self.max_age || self.min_age < 0 || self.max_age > 120 {
            return Err(TriageError::Config(format!(
                "invalid age range {}..={}",
                self.min_age, self.max_age
            )));
        }
        Ok(())
    }
}

/// Configuration for the secondary (hospital emergency) dataset
#[derive(Debug, Clone, Default)]
pub struct SecondaryConfig {
    /// CSV file to read; `None` skips the secondary source
    pub path: Option<PathBuf>,
    /// Seed for label, symptom and vital inference
    pub seed: Option<u64>,
}

/// How many features each split may consider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// floor(sqrt(n_features)), at least 1
    Sqrt,
    /// Every feature
    All,
    /// A fixed count, capped at the number of features
    Fixed(usize),
}

impl MaxFeatures {
    /// Resolve to a concrete count for `n_features` inputs
    #[must_use]
    pub fn resolve(self, n_features: usize) -> usize {
        let count = match self {
            Self::Sqrt => (n_features as f64).sqrt() as usize,
            Self::All => n_features,
            Self::Fixed(n) => n,
        };
        count.clamp(1, n_features.max(1))
    }
}

/// Random forest hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForestParams {
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum tree depth; `None` grows until leaves are pure
    pub max_depth: Option<usize>,
    /// Minimum samples a node needs before it may split
    pub min_samples_split: usize,
    /// Minimum samples each child of a split must keep
    pub min_samples_leaf: usize,
    /// Features considered per split
    pub max_features: MaxFeatures,
    /// Draw a bootstrap sample per tree
    pub bootstrap: bool,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 150,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
        }
    }
}

/// Configuration for the training pipeline
#[derive(Debug, Clone)]
pub struct TrainingConfig {
    /// Forest hyperparameters
    pub forest: ForestParams,
    /// Share of rows held out for scoring
    pub test_fraction: f64,
    /// Master seed for the split and the forest; `None` uses OS entropy
    pub seed: Option<u64>,
    /// Worker threads used to fit trees
    pub n_jobs: usize,
    /// Show progress bars while fitting
    pub show_progress: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            forest: ForestParams::default(),
            test_fraction: 0.2,
            seed: Some(DEFAULT_SEED),
            n_jobs: num_cpus::get(),
            show_progress: true,
        }
    }
}

impl TrainingConfig {
    /// Create a new instance with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new builder for constructing a training configuration
    #[must_use]
    pub fn builder() -> TrainingConfigBuilder {
        TrainingConfigBuilder::new()
    }

    /// Check that values are in range
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.test_fraction) {
            return Err(TriageError::Config(format!(
                "test fraction {} must be in [0, 1)",
                self.test_fraction
            )));
        }
        if self.forest.n_estimators == 0 {
            return Err(TriageError::Config("forest needs at least one tree".to_string()));
        }
        if self.forest.min_samples_split < 2 || self.forest.min_samples_leaf == 0 {
            return Err(TriageError::Config(
                "min_samples_split must be >= 2 and min_samples_leaf >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for TrainingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Training Configuration:")?;
        writeln!(f, "  Trees: {}", self.forest.n_estimators)?;
        match self.forest.max_depth {
            Some(depth) => writeln!(f, "  Max Depth: {depth}")?,
            None => writeln!(f, "  Max Depth: unlimited")?,
        }
        writeln!(f, "  Max Features: {:?}", self.forest.max_features)?;
        writeln!(f, "  Test Fraction: {}", self.test_fraction)?;
        if let Some(seed) = self.seed {
            writeln!(f, "  Seed: {seed}")?;
        }
        writeln!(f, "  Worker Threads: {}", self.n_jobs)?;
        Ok(())
    }
}

/// Builder for constructing a training configuration
#[derive(Debug, Clone)]
pub struct TrainingConfigBuilder {
    config: TrainingConfig,
}

impl Default for TrainingConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TrainingConfigBuilder {
    /// Create a new builder with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: TrainingConfig::default(),
        }
    }

    /// Set the number of trees
    #[must_use]
    pub fn n_estimators(mut self, n: usize) -> Self {
        self.config.forest.n_estimators = n;
        self
    }

    /// Limit tree depth
    #[must_use]
    pub fn max_depth(mut self, depth: Option<usize>) -> Self {
        self.config.forest.max_depth = depth;
        self
    }

    /// Set the held-out share
    #[must_use]
    pub fn test_fraction(mut self, fraction: f64) -> Self {
        self.config.test_fraction = fraction;
        self
    }

    /// Set or clear the master seed
    #[must_use]
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.config.seed = seed;
        self
    }

    /// Set the number of worker threads
    #[must_use]
    pub fn n_jobs(mut self, n_jobs: usize) -> Self {
        self.config.n_jobs = n_jobs.max(1);
        self
    }

    /// Enable or disable progress bars
    #[must_use]
    pub fn show_progress(mut self, show: bool) -> Self {
        self.config.show_progress = show;
        self
    }

    /// Build the configuration, checking value ranges
    pub fn build(self) -> Result<TrainingConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Locations of the three persisted artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    /// Directory holding all artifacts
    pub dir: PathBuf,
}

impl ArtifactPaths {
    /// Classifier file name
    pub const MODEL_FILE: &'static str = "triage_model.json";
    /// Gender encoder file name
    pub const GENDER_ENCODER_FILE: &'static str = "le_gender.json";
    /// Symptom encoder file name
    pub const SYMPTOM_ENCODER_FILE: &'static str = "le_symptom.json";

    /// Artifacts inside `dir`
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the classifier artifact
    #[must_use]
    pub fn model(&self) -> PathBuf {
        self.dir.join(Self::MODEL_FILE)
    }

    /// Path of the gender encoder artifact
    #[must_use]
    pub fn gender_encoder(&self) -> PathBuf {
        self.dir.join(Self::GENDER_ENCODER_FILE)
    }

    /// Path of the symptom encoder artifact
    #[must_use]
    pub fn symptom_encoder(&self) -> PathBuf {
        self.dir.join(Self::SYMPTOM_ENCODER_FILE)
    }

    /// The artifact directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_DIR)
    }
}
