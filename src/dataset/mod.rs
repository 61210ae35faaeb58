//! Dataset Builder
//!
//! Corpus files follow the column contract in [`crate::schema`]: exactly the
//! eight corpus columns, in order, with a header row. CSV is the contract
//! format; files ending in `.parquet` are read and written as Parquet.
//!
//! Records move to and from Arrow record batches through `serde_arrow`, so
//! both formats share one conversion path.

use std::fmt;
use std::io::Seek;
use std::path::Path;
use std::time::Instant;

use arrow::compute::cast;
use arrow::csv::reader::Format;
use arrow::record_batch::RecordBatch;
use arrow_schema::FieldRef;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use rustc_hash::FxHashMap;

use crate::algorithm::synth::SyntheticGenerator;
use crate::config::GeneratorConfig;
use crate::error::util::{safe_create_file, safe_open_file};
use crate::error::{Result, TriageError};
use crate::models::{TriageLevel, TriageRecord};
use crate::schema::{corpus_schema, ensure_corpus_columns};
use crate::utils::logging::{log_operation_complete, log_operation_start};

/// On-disk corpus format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorpusFormat {
    /// Comma-separated values with a header row
    Csv,
    /// Apache Parquet
    Parquet,
}

impl CorpusFormat {
    /// Pick the format from a file extension; anything but `.parquet` is CSV
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("parquet") => Self::Parquet,
            _ => Self::Csv,
        }
    }
}

/// Convert corpus records into a record batch with the corpus schema
pub fn records_to_batch(records: &[TriageRecord]) -> Result<RecordBatch> {
    let fields: Vec<FieldRef> = corpus_schema().fields().iter().cloned().collect();
    Ok(serde_arrow::to_record_batch(&fields, &records)?)
}

/// Convert a record batch with the corpus columns back into records
pub fn batch_to_records(batch: &RecordBatch) -> Result<Vec<TriageRecord>> {
    let batch = conform_batch(batch)?;
    let records: Vec<TriageRecord> = serde_arrow::from_record_batch(&batch)?;
    for (row, record) in records.iter().enumerate() {
        if TriageLevel::new(record.triage_level).is_none() {
            return Err(TriageError::Schema(format!(
                "row {row} has triage level {} outside 1..=5",
                record.triage_level
            )));
        }
    }
    Ok(records)
}

/// Check the column names and cast every column to the corpus type
fn conform_batch(batch: &RecordBatch) -> Result<RecordBatch> {
    let schema = batch.schema();
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    ensure_corpus_columns(&names)?;

    let target = corpus_schema();
    let columns = batch
        .columns()
        .iter()
        .zip(target.fields())
        .map(|(column, field)| cast(column, field.data_type()))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(RecordBatch::try_new(target, columns)?)
}

/// Write a corpus file in the format implied by its extension
pub fn write_corpus(path: &Path, records: &[TriageRecord]) -> Result<()> {
    log_operation_start("Writing corpus to", path);
    let start = Instant::now();

    let batch = records_to_batch(records)?;
    let file = safe_create_file(path, "training corpus")?;

    match CorpusFormat::from_path(path) {
        CorpusFormat::Csv => {
            let mut writer = arrow::csv::WriterBuilder::new().with_header(true).build(file);
            writer.write(&batch)?;
        }
        CorpusFormat::Parquet => {
            let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
            writer.write(&batch)?;
            writer.close()?;
        }
    }

    log_operation_complete("wrote", path, records.len(), Some(start.elapsed()));
    Ok(())
}

/// Read a corpus file.
///
/// A missing file is [`TriageError::NoTrainingData`]; a header that breaks
/// the column contract is a schema error.
pub fn read_corpus(path: &Path) -> Result<Vec<TriageRecord>> {
    if !path.is_file() {
        return Err(TriageError::NoTrainingData {
            path: path.to_path_buf(),
        });
    }

    log_operation_start("Reading corpus from", path);
    let start = Instant::now();

    let batches = match CorpusFormat::from_path(path) {
        CorpusFormat::Csv => read_csv_batches(path)?,
        CorpusFormat::Parquet => read_parquet_batches(path)?,
    };

    let mut records = Vec::new();
    for batch in &batches {
        records.extend(batch_to_records(batch)?);
    }

    log_operation_complete("read", path, records.len(), Some(start.elapsed()));
    Ok(records)
}

fn read_csv_batches(path: &Path) -> Result<Vec<RecordBatch>> {
    let mut file = safe_open_file(path, "training corpus")?;

    let (header, _) = Format::default()
        .with_header(true)
        .infer_schema(&mut file, Some(0))?;
    let names: Vec<&str> = header.fields().iter().map(|f| f.name().as_str()).collect();
    ensure_corpus_columns(&names)?;
    file.rewind()?;

    let reader = arrow::csv::ReaderBuilder::new(corpus_schema())
        .with_header(true)
        .build(file)?;
    Ok(reader.collect::<std::result::Result<Vec<_>, _>>()?)
}

fn read_parquet_batches(path: &Path) -> Result<Vec<RecordBatch>> {
    let file = safe_open_file(path, "training corpus")?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    Ok(reader.collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Generate a synthetic corpus and write it to `path`
///
/// # Returns
/// The number of rows written
pub fn generate_corpus(config: &GeneratorConfig, path: &Path) -> Result<usize> {
    config.validate()?;
    let records = SyntheticGenerator::new(config.clone()).generate()?;
    write_corpus(path, &records)?;
    Ok(records.len())
}

/// A merged training corpus with its provenance
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    /// Primary rows followed by secondary rows
    pub records: Vec<TriageRecord>,
    /// Rows from the primary synthetic corpus
    pub primary_rows: usize,
    /// Rows derived from the secondary dataset
    pub secondary_rows: usize,
}

impl Corpus {
    /// Number of rows per level, ascending by level
    #[must_use]
    pub fn level_counts(&self) -> Vec<(i32, usize)> {
        let mut counts: FxHashMap<i32, usize> = FxHashMap::default();
        for record in &self.records {
            *counts.entry(record.triage_level).or_default() += 1;
        }
        let mut counts: Vec<_> = counts.into_iter().collect();
        counts.sort_unstable();
        counts
    }

    /// Total number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the corpus has no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl fmt::Display for Corpus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows ({} synthetic, {} secondary); levels:",
            self.len(),
            self.primary_rows,
            self.secondary_rows
        )?;
        for (level, count) in self.level_counts() {
            write!(f, " {level}={count}")?;
        }
        Ok(())
    }
}

/// Builds the training corpus from the primary and optional secondary source
#[derive(Debug, Default)]
pub struct DatasetBuilder {
    primary: Vec<TriageRecord>,
    secondary: Vec<TriageRecord>,
}

impl DatasetBuilder {
    /// Start from the primary corpus
    #[must_use]
    pub fn new(primary: Vec<TriageRecord>) -> Self {
        Self {
            primary,
            secondary: Vec::new(),
        }
    }

    /// Add secondary rows; an empty set leaves the primary corpus as is
    #[must_use]
    pub fn with_secondary(mut self, secondary: Vec<TriageRecord>) -> Self {
        self.secondary = secondary;
        self
    }

    /// Concatenate the sources. Rows are not deduplicated or rebalanced.
    pub fn build(self) -> Result<Corpus> {
        if self.primary.is_empty() {
            return Err(TriageError::Schema("primary corpus has no rows".to_string()));
        }
        if self.secondary.is_empty() {
            log::info!("Training on the synthetic corpus only");
        }

        let primary_rows = self.primary.len();
        let secondary_rows = self.secondary.len();
        let mut records = self.primary;
        records.extend(self.secondary);

        Ok(Corpus {
            records,
            primary_rows,
            secondary_rows,
        })
    }
}
