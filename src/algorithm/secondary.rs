//! Secondary dataset derivation
//!
//! The hospital emergency dataset only records age, gender and whether the
//! patient was admitted. Labels, symptoms and vitals are inferred from the
//! admission flag so the rows fit the corpus contract:
//!
//! 1. admitted patients draw a level from {1, 2, 3}, others from {3, 4, 5};
//! 2. a symptom is drawn from the pool matching the level's severity tier;
//! 3. vitals are drawn conditioned on the level.
//!
//! Any failure to read the file is recoverable: training continues on the
//! synthetic corpus alone.

use std::io::Seek;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, AsArray};
use arrow::compute::cast;
use arrow::csv::reader::Format;
use arrow::datatypes::{DataType, Float64Type};
use arrow::record_batch::RecordBatch;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;

use crate::algorithm::severity;
use crate::algorithm::synth::{VitalSignSynthesizer, clamp_spo2, round_temperature, weighted_choice};
use crate::config::SecondaryConfig;
use crate::error::util::safe_open_file;
use crate::error::{Result, TriageError};
use crate::models::{Gender, TriageLevel, TriageRecord};
use crate::utils::logging::{log_operation_complete, log_operation_start, log_warning};

/// Column holding "M"/"F"
pub const GENDER_COLUMN: &str = "Patient Gender";
/// Column holding the age in years
pub const AGE_COLUMN: &str = "Patient Age";
/// Column holding the admission flag
pub const ADMISSION_COLUMN: &str = "Patient Admission Flag";

/// Level weights for admitted patients
const ADMITTED_LEVELS: [(i32, f64); 3] = [(1, 0.3), (2, 0.4), (3, 0.3)];
/// Level weights for patients sent home
const DISCHARGED_LEVELS: [(i32, f64); 3] = [(3, 0.2), (4, 0.4), (5, 0.4)];

/// The three fields used from one secondary row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionRow {
    /// Age in years
    pub age: i32,
    /// Gender, already mapped from "M"/"F"
    pub gender: Gender,
    /// Whether the patient was admitted
    pub admitted: bool,
}

/// Map the dataset's gender code; anything but "F" is treated as male
#[must_use]
pub fn map_gender(code: Option<&str>) -> Gender {
    match code.map(str::trim) {
        Some("F") => Gender::Female,
        _ => Gender::Male,
    }
}

/// Read the admission rows of a secondary CSV file
pub fn read_admission_rows(path: &Path) -> Result<Vec<AdmissionRow>> {
    log_operation_start("Reading secondary dataset", path);
    let start = std::time::Instant::now();

    let mut file = safe_open_file(path, "secondary dataset")?;
    let (schema, _) = Format::default()
        .with_header(true)
        .infer_schema(&mut file, Some(1000))?;
    file.rewind()?;

    let reader = arrow::csv::ReaderBuilder::new(Arc::new(schema))
        .with_header(true)
        .build(file)?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for batch in reader {
        skipped += extract_rows(&batch?, &mut rows)?;
    }

    if skipped > 0 {
        log_warning(
            &format!("Skipped {skipped} secondary rows without an age"),
            Some(path),
        );
    }
    log_operation_complete("read", path, rows.len(), Some(start.elapsed()));
    Ok(rows)
}

/// Append the rows of one batch, returning how many rows were skipped
fn extract_rows(batch: &RecordBatch, rows: &mut Vec<AdmissionRow>) -> Result<usize> {
    let column = |name: &str| {
        batch
            .column_by_name(name)
            .ok_or_else(|| TriageError::Schema(format!("secondary dataset has no '{name}' column")))
    };

    let genders = cast(column(GENDER_COLUMN)?, &DataType::Utf8)?;
    let ages = cast(column(AGE_COLUMN)?, &DataType::Float64)?;
    let flags = cast(column(ADMISSION_COLUMN)?, &DataType::Boolean)?;

    let genders = genders.as_string::<i32>();
    let ages = ages.as_primitive::<Float64Type>();
    let flags = flags.as_boolean();

    let mut skipped = 0;
    for i in 0..batch.num_rows() {
        if ages.is_null(i) {
            skipped += 1;
            continue;
        }
        let gender = (!genders.is_null(i)).then(|| genders.value(i));
        rows.push(AdmissionRow {
            age: ages.value(i).round() as i32,
            gender: map_gender(gender),
            admitted: !flags.is_null(i) && flags.value(i),
        });
    }
    Ok(skipped)
}

/// Derives labeled corpus rows from admission rows
#[derive(Debug)]
pub struct SecondaryDeriver {
    synthesizer: VitalSignSynthesizer,
    rng: StdRng,
}

impl SecondaryDeriver {
    /// Create a deriver; a seed makes the inference reproducible
    #[must_use]
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            synthesizer: VitalSignSynthesizer,
            rng,
        }
    }

    /// Infer a level from the admission flag
    pub fn infer_level(&mut self, admitted: bool) -> Result<TriageLevel> {
        let weights = if admitted {
            &ADMITTED_LEVELS[..]
        } else {
            &DISCHARGED_LEVELS[..]
        };
        let level = weighted_choice(&mut self.rng, weights)?;
        TriageLevel::new(level)
            .ok_or_else(|| TriageError::Config(format!("inferred level {level} out of range")))
    }

    /// Draw a symptom from the pool matching the level's severity tier
    pub fn assign_symptom(&mut self, level: TriageLevel) -> Result<&'static str> {
        severity::symptom_pool_for_level(level)
            .choose(&mut self.rng)
            .copied()
            .ok_or_else(|| TriageError::Config(format!("no symptoms for level {level}")))
    }

    /// Derive one corpus row
    pub fn derive(&mut self, row: &AdmissionRow) -> Result<TriageRecord> {
        let level = self.infer_level(row.admitted)?;
        let symptom = self.assign_symptom(level)?;
        let vitals = self.synthesizer.for_level(&mut self.rng, level)?;

        Ok(TriageRecord {
            age: row.age,
            gender: row.gender.as_str().to_string(),
            symptom: symptom.to_string(),
            temperature: round_temperature(vitals.temperature),
            heart_rate: vitals.heart_rate as i32,
            spo2: clamp_spo2(vitals.spo2).trunc(),
            systolic_bp: vitals.systolic_bp as i32,
            triage_level: level.value(),
        })
    }

    /// Derive corpus rows for every admission row
    pub fn derive_all(&mut self, rows: &[AdmissionRow]) -> Result<Vec<TriageRecord>> {
        rows.iter().map(|row| self.derive(row)).collect()
    }
}

/// Load and derive the secondary corpus, failing on any error
pub fn try_load_secondary(path: &Path, seed: Option<u64>) -> Result<Vec<TriageRecord>> {
    let rows = read_admission_rows(path)?;
    SecondaryDeriver::new(seed).derive_all(&rows)
}

/// Load the secondary corpus; a missing or unreadable source yields an
/// empty corpus and a warning
#[must_use]
pub fn load_secondary(config: &SecondaryConfig) -> Vec<TriageRecord> {
    let Some(path) = config.path.as_deref() else {
        log::info!("No secondary dataset configured; using synthetic data only");
        return Vec::new();
    };

    match try_load_secondary(path, config.seed) {
        Ok(records) => records,
        Err(e) => {
            log_warning(
                &format!("Error processing secondary dataset ({e}); continuing with synthetic data only"),
                Some(path),
            );
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_gender_mapping() {
        assert_eq!(map_gender(Some("F")), Gender::Female);
        assert_eq!(map_gender(Some("M")), Gender::Male);
        assert_eq!(map_gender(Some("X")), Gender::Male);
        assert_eq!(map_gender(None), Gender::Male);
    }

    #[test]
    fn test_admitted_levels_are_urgent() {
        let mut deriver = SecondaryDeriver::new(Some(1));
        for _ in 0..500 {
            let level = deriver.infer_level(true).unwrap().value();
            assert!((1..=3).contains(&level));
            let level = deriver.infer_level(false).unwrap().value();
            assert!((3..=5).contains(&level));
        }
    }

    #[test]
    fn test_level_frequencies_follow_weights() {
        const DRAWS: usize = 5000;
        let mut deriver = SecondaryDeriver::new(Some(7));
        for (admitted, weights) in [(true, ADMITTED_LEVELS), (false, DISCHARGED_LEVELS)] {
            let mut counts = [0usize; 6];
            for _ in 0..DRAWS {
                counts[deriver.infer_level(admitted).unwrap().value() as usize] += 1;
            }
            for (level, weight) in weights {
                let observed = counts[level as usize] as f64 / DRAWS as f64;
                assert!(
                    (observed - weight).abs() < 0.03,
                    "admitted={admitted} level {level}: {observed:.3} vs {weight}"
                );
            }
        }
    }

    #[test]
    fn test_derived_symptom_matches_tier() {
        let mut deriver = SecondaryDeriver::new(Some(2));
        let row = AdmissionRow {
            age: 50,
            gender: Gender::Female,
            admitted: true,
        };
        for _ in 0..300 {
            let record = deriver.derive(&row).unwrap();
            let level = TriageLevel::new(record.triage_level).unwrap();
            assert!(severity::symptom_pool_for_level(level).contains(&record.symptom.as_str()));
            assert!((60.0..=100.0).contains(&record.spo2));
            assert_eq!(record.spo2, record.spo2.trunc());
        }
    }

    #[test]
    fn test_read_csv() {
        let file = write_csv(
            "Patient Id,Patient Gender,Patient Age,Patient Admission Flag\n\
             1,M,34,True\n\
             2,F,71,False\n\
             3,,8,False\n",
        );
        let rows = read_admission_rows(file.path()).unwrap();
        assert_eq!(
            rows,
            vec![
                AdmissionRow { age: 34, gender: Gender::Male, admitted: true },
                AdmissionRow { age: 71, gender: Gender::Female, admitted: false },
                AdmissionRow { age: 8, gender: Gender::Male, admitted: false },
            ]
        );
    }

    #[test]
    fn test_missing_source_is_not_fatal() {
        let config = SecondaryConfig {
            path: Some("/no/such/emergency.csv".into()),
            seed: Some(1),
        };
        assert!(load_secondary(&config).is_empty());
        assert!(load_secondary(&SecondaryConfig::default()).is_empty());
    }

    #[test]
    fn test_wrong_columns_are_not_fatal() {
        let file = write_csv("a,b\n1,2\n");
        let config = SecondaryConfig {
            path: Some(file.path().to_path_buf()),
            seed: Some(1),
        };
        assert!(load_secondary(&config).is_empty());
    }
}
