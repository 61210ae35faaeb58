//! Synthetic corpus generation
//!
//! Rows are generated so that the label is plausible given both the symptom
//! and the vitals: vitals are drawn from baseline distributions, shifted by
//! the symptom's vital pattern, and the label drawn from the symptom's
//! plausible levels is then escalated by the shared threshold rules.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;

use crate::algorithm::rules::THRESHOLDS;
use crate::algorithm::severity::{self, SYMPTOM_PROFILES, SymptomProfile, VitalPattern};
use crate::config::GeneratorConfig;
use crate::error::{Result, TriageError};
use crate::models::{Gender, TriageLevel, TriageRecord};

/// SpO2 is clamped to this range (%)
pub const SPO2_RANGE: (f64, f64) = (60.0, 100.0);

/// Draw from a normal distribution using the Box-Muller transform
pub fn sample_normal<R: Rng + ?Sized>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    // 1 - u keeps u1 in (0, 1] so the logarithm is finite
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random::<f64>();
    let r = (-2.0 * u1.ln()).sqrt();
    let theta = 2.0 * std::f64::consts::PI * u2;
    mean + r * theta.cos() * std_dev
}

/// Clamp SpO2 into [60, 100]
#[must_use]
pub fn clamp_spo2(spo2: f64) -> f64 {
    spo2.clamp(SPO2_RANGE.0, SPO2_RANGE.1)
}

/// Round a temperature to one decimal place
#[must_use]
pub fn round_temperature(temperature: f64) -> f64 {
    (temperature * 10.0).round() / 10.0
}

/// Continuous vitals before rounding and truncation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawVitals {
    /// Body temperature in °C
    pub temperature: f64,
    /// Heart rate in bpm
    pub heart_rate: f64,
    /// Oxygen saturation in %
    pub spo2: f64,
    /// Systolic blood pressure in mmHg
    pub systolic_bp: f64,
}

/// Vital sign synthesizer
///
/// Stateless; every draw goes through the caller's RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct VitalSignSynthesizer;

impl VitalSignSynthesizer {
    /// Draw symptom-agnostic baseline vitals
    pub fn baseline<R: Rng + ?Sized>(&self, rng: &mut R) -> RawVitals {
        RawVitals {
            temperature: sample_normal(rng, 37.0, 0.5),
            heart_rate: sample_normal(rng, 75.0, 10.0),
            spo2: sample_normal(rng, 98.0, 1.0),
            systolic_bp: sample_normal(rng, 120.0, 10.0),
        }
    }

    /// Shift vitals according to a symptom's vital pattern
    pub fn apply_pattern<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        vitals: RawVitals,
        pattern: VitalPattern,
    ) -> RawVitals {
        let mut v = vitals;
        match pattern {
            VitalPattern::Baseline => {}
            VitalPattern::Febrile => {
                v.temperature += rng.random_range(1.5..3.0);
                v.heart_rate += 20.0;
            }
            VitalPattern::Cardiorespiratory => {
                v.heart_rate += 20.0;
                v.spo2 -= rng.random_range(5.0..15.0);
                v.systolic_bp += 30.0;
            }
            VitalPattern::Unresponsive => {
                v.systolic_bp -= 40.0;
                v.spo2 -= 10.0;
            }
            VitalPattern::Hemorrhagic => {
                v.heart_rate += 40.0;
                v.systolic_bp -= 30.0;
            }
        }
        v
    }

    /// Draw vitals conditioned on a target level.
    ///
    /// Critical levels (1-2) draw from deranged discrete and normal
    /// distributions; other levels use the baseline distributions.
    pub fn for_level<R: Rng + ?Sized>(&self, rng: &mut R, level: TriageLevel) -> Result<RawVitals> {
        if !level.is_critical() {
            return Ok(self.baseline(rng));
        }

        let temperature = weighted_choice(rng, &[(39.8, 0.4), (36.0, 0.1), (37.5, 0.5)])?;
        let heart_rate = sample_normal(rng, 110.0, 15.0);
        let spo2 = sample_normal(rng, 88.0, 5.0);
        let systolic_bp = weighted_choice(rng, &[(160.0, 0.4), (80.0, 0.3), (120.0, 0.3)])?;

        Ok(RawVitals {
            temperature,
            heart_rate,
            spo2,
            systolic_bp,
        })
    }
}

/// Pick one value from `(value, weight)` pairs
pub fn weighted_choice<R: Rng + ?Sized, T: Copy>(rng: &mut R, choices: &[(T, f64)]) -> Result<T> {
    use rand::distr::weighted::WeightedIndex;

    let dist = WeightedIndex::new(choices.iter().map(|(_, w)| *w))
        .map_err(|e| TriageError::Config(format!("invalid sampling weights: {e}")))?;
    Ok(choices[dist.sample(rng)].0)
}

/// Generator of label-consistent synthetic triage rows
#[derive(Debug)]
pub struct SyntheticGenerator {
    config: GeneratorConfig,
    synthesizer: VitalSignSynthesizer,
    rng: StdRng,
}

impl SyntheticGenerator {
    /// Create a generator; a configured seed makes the output reproducible
    #[must_use]
    pub fn new(config: GeneratorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            config,
            synthesizer: VitalSignSynthesizer,
            rng,
        }
    }

    /// Generate one row
    pub fn generate_record(&mut self) -> Result<TriageRecord> {
        let rng = &mut self.rng;

        let age = rng.random_range(self.config.min_age..=self.config.max_age);
        let gender = *Gender::ALL
            .choose(rng)
            .ok_or_else(|| TriageError::Config("no genders to draw from".to_string()))?;
        let profile: &SymptomProfile = SYMPTOM_PROFILES
            .choose(rng)
            .ok_or_else(|| TriageError::Config("empty symptom vocabulary".to_string()))?;

        let raw = self.synthesizer.baseline(rng);
        let raw = self.synthesizer.apply_pattern(rng, raw, profile.pattern);

        let spo2 = clamp_spo2(raw.spo2);
        let temperature = round_temperature(raw.temperature);
        let heart_rate = raw.heart_rate as i32;
        let systolic_bp = raw.systolic_bp as i32;

        let base_level = profile
            .plausible_levels()
            .collect::<Vec<_>>()
            .choose(rng)
            .copied()
            .ok_or_else(|| {
                TriageError::Config(format!("symptom {} has no plausible levels", profile.name))
            })?;

        let mut record = TriageRecord {
            age,
            gender: gender.as_str().to_string(),
            symptom: profile.name.to_string(),
            temperature,
            heart_rate,
            spo2,
            systolic_bp,
            triage_level: base_level.value(),
        };
        record.triage_level = THRESHOLDS.escalate(base_level, age, &record.vitals()).value();

        Ok(record)
    }

    /// Generate the configured number of rows
    pub fn generate(&mut self) -> Result<Vec<TriageRecord>> {
        let rows = self.config.rows;
        log::info!(
            "Generating {} synthetic triage rows from {} symptoms",
            rows,
            severity::symptom_names().count()
        );
        (0..rows).map(|_| self.generate_record()).collect()
    }
}
