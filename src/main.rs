use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use log::info;
use triage_ml::config::{DEFAULT_CORPUS_PATH, DEFAULT_MODEL_DIR, DEFAULT_SEED, MODEL_DIR_ENV};
use triage_ml::{ArtifactPaths, GeneratorConfig, SecondaryConfig, TrainingConfig};

#[global_allocator]
static ALLOC: snmalloc_rs::SnMalloc = snmalloc_rs::SnMalloc;

#[derive(Parser, Debug)]
#[command(name = "triage", version, about = "Emergency triage model: generate, train, predict")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a synthetic training corpus
    Generate {
        /// Number of rows
        #[arg(long, default_value_t = 5000)]
        rows: usize,
        /// Seed for every random draw
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
        /// Output file (.csv or .parquet)
        #[arg(long, short = 'o', default_value = DEFAULT_CORPUS_PATH)]
        output: PathBuf,
    },
    /// Fit encoders and classifier and save the artifacts
    Train {
        /// Primary synthetic corpus
        #[arg(long, default_value = DEFAULT_CORPUS_PATH)]
        data: PathBuf,
        /// Optional hospital emergency CSV to derive extra rows from
        #[arg(long)]
        secondary: Option<PathBuf>,
        /// Number of trees
        #[arg(long, default_value_t = 150)]
        trees: usize,
        /// Maximum tree depth
        #[arg(long)]
        max_depth: Option<usize>,
        /// Share of rows held out for scoring
        #[arg(long, default_value_t = 0.2)]
        test_fraction: f64,
        /// Master seed
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
        /// Worker threads; defaults to the number of cores
        #[arg(long)]
        jobs: Option<usize>,
        /// Artifact directory
        #[arg(long, env = MODEL_DIR_ENV, default_value = DEFAULT_MODEL_DIR)]
        model_dir: PathBuf,
        /// Hide progress bars
        #[arg(long)]
        quiet: bool,
    },
    /// Assess one JSON request and print the JSON response
    Predict {
        /// Request as JSON
        request: String,
        /// Artifact directory
        #[arg(long, env = MODEL_DIR_ENV, default_value = DEFAULT_MODEL_DIR)]
        model_dir: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    // Setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        Command::Generate { rows, seed, output } => {
            let config = GeneratorConfig {
                rows,
                seed: Some(seed),
                ..GeneratorConfig::default()
            };
            let written = triage_ml::generate_corpus(&config, &output)
                .with_context(|| format!("failed to generate {}", output.display()))?;
            info!("Dataset generated: {} with {written} samples", output.display());
        }
        Command::Train {
            data,
            secondary,
            trees,
            max_depth,
            test_fraction,
            seed,
            jobs,
            model_dir,
            quiet,
        } => {
            let mut builder = TrainingConfig::builder()
                .n_estimators(trees)
                .max_depth(max_depth)
                .test_fraction(test_fraction)
                .seed(Some(seed))
                .show_progress(!quiet);
            if let Some(jobs) = jobs {
                builder = builder.n_jobs(jobs);
            }
            let config = builder.build().context("invalid training options")?;
            let secondary = SecondaryConfig {
                path: secondary,
                seed: Some(seed.wrapping_add(1)),
            };

            let report = triage_ml::train(&data, &secondary, &config, &ArtifactPaths::new(model_dir))
                .context("training failed")?;
            println!("{report}");
        }
        Command::Predict { request, model_dir } => {
            // Errors are part of the response; the exit code stays 0
            println!("{}", triage_ml::predict_json(&ArtifactPaths::new(model_dir), &request));
        }
    }

    Ok(())
}
