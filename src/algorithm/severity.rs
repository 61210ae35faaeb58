//! Symptom severity model
//!
//! One static table drives everything that depends on a symptom: the levels
//! it can plausibly produce, its severity tier (used when back-assigning
//! symptoms to secondary data), and the way it shifts vital signs.

use std::fmt;

use rustc_hash::FxHashMap;
use std::sync::LazyLock;

use crate::models::TriageLevel;

/// Symptom used for encoding when the primary symptom was never seen in training
pub const DEFAULT_SYMPTOM: &str = "Headache";

/// Primary symptom used when a request carries no symptoms at all
pub const EMPTY_SYMPTOMS_SENTINEL: &str = "Initial";

/// Coarse severity tier of a symptom
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SeverityTier {
    /// Life-threatening presentations
    Critical,
    /// Needs timely care
    Urgent,
    /// Can wait
    Routine,
}

impl SeverityTier {
    /// Get a descriptive name for this tier
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Critical => "Critical",
            Self::Urgent => "Urgent",
            Self::Routine => "Routine",
        }
    }
}

impl fmt::Display for SeverityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// How a symptom perturbs baseline vitals during synthesis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VitalPattern {
    /// No shift
    Baseline,
    /// Temperature +1.5..3.0 °C, heart rate +20
    Febrile,
    /// Heart rate +20, SpO2 -5..15, systolic +30
    Cardiorespiratory,
    /// Systolic -40, SpO2 -10
    Unresponsive,
    /// Heart rate +40, systolic -30
    Hemorrhagic,
}

/// Everything the pipeline knows about one symptom
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymptomProfile {
    /// Symptom name as it appears in the corpus
    pub name: &'static str,
    /// Plausible base levels before escalation
    pub levels: &'static [u8],
    /// Severity tier
    pub tier: SeverityTier,
    /// Vital sign shift applied during synthesis
    pub pattern: VitalPattern,
}

impl SymptomProfile {
    /// Plausible base levels as typed levels
    pub fn plausible_levels(&self) -> impl Iterator<Item = TriageLevel> + '_ {
        self.levels
            .iter()
            .filter_map(|&level| TriageLevel::new(i32::from(level)))
    }

    /// Least urgent plausible base level (the highest number)
    #[must_use]
    pub fn least_urgent_level(&self) -> TriageLevel {
        self.plausible_levels()
            .max()
            .unwrap_or(TriageLevel::LEAST_URGENT)
    }

    /// Whether this symptom can produce level 1 on its own
    #[must_use]
    pub fn is_critical(&self) -> bool {
        self.tier == SeverityTier::Critical
    }
}

const fn profile(
    name: &'static str,
    levels: &'static [u8],
    tier: SeverityTier,
    pattern: VitalPattern,
) -> SymptomProfile {
    SymptomProfile {
        name,
        levels,
        tier,
        pattern,
    }
}

/// The symptom vocabulary, in generation order
pub static SYMPTOM_PROFILES: [SymptomProfile; 14] = [
    profile("Chest Pain", &[1, 2], SeverityTier::Critical, VitalPattern::Cardiorespiratory),
    profile("Difficulty Breathing", &[1, 2], SeverityTier::Critical, VitalPattern::Cardiorespiratory),
    profile("Severe Bleeding", &[1], SeverityTier::Critical, VitalPattern::Hemorrhagic),
    profile("Unconscious", &[1], SeverityTier::Critical, VitalPattern::Unresponsive),
    profile("Stroke Symptoms", &[1, 2], SeverityTier::Critical, VitalPattern::Baseline),
    profile("High Fever", &[2, 3], SeverityTier::Urgent, VitalPattern::Febrile),
    profile("Abdominal Pain", &[2, 3], SeverityTier::Urgent, VitalPattern::Baseline),
    profile("Vomiting", &[3, 4], SeverityTier::Urgent, VitalPattern::Baseline),
    profile("Broken Bone", &[3], SeverityTier::Urgent, VitalPattern::Baseline),
    profile("Headache", &[3, 4, 5], SeverityTier::Routine, VitalPattern::Baseline),
    profile("Dizziness", &[3, 4], SeverityTier::Routine, VitalPattern::Baseline),
    profile("Cough", &[4, 5], SeverityTier::Routine, VitalPattern::Baseline),
    profile("Sore Throat", &[5], SeverityTier::Routine, VitalPattern::Baseline),
    profile("Fatigue", &[4, 5], SeverityTier::Routine, VitalPattern::Baseline),
];

static PROFILE_INDEX: LazyLock<FxHashMap<&'static str, &'static SymptomProfile>> =
    LazyLock::new(|| SYMPTOM_PROFILES.iter().map(|p| (p.name, p)).collect());

/// Look up a symptom profile by exact name
#[must_use]
pub fn lookup(symptom: &str) -> Option<&'static SymptomProfile> {
    PROFILE_INDEX.get(symptom).copied()
}

/// Whether the symptom belongs to the critical set used in explanations
#[must_use]
pub fn is_critical_symptom(symptom: &str) -> bool {
    lookup(symptom).is_some_and(SymptomProfile::is_critical)
}

/// All symptom names, in generation order
pub fn symptom_names() -> impl Iterator<Item = &'static str> {
    SYMPTOM_PROFILES.iter().map(|p| p.name)
}

/// Names of the symptoms in one tier, in generation order
#[must_use]
pub fn tier_symptoms(tier: SeverityTier) -> Vec<&'static str> {
    SYMPTOM_PROFILES
        .iter()
        .filter(|p| p.tier == tier)
        .map(|p| p.name)
        .collect()
}

/// Symptom pool for back-assigning a symptom to an inferred level.
///
/// Levels 1-2 draw from critical symptoms, level 3 from urgent and critical
/// ones, and levels 4-5 from routine and urgent ones.
#[must_use]
pub fn symptom_pool_for_level(level: TriageLevel) -> Vec<&'static str> {
    let tiers: &[SeverityTier] = match level.value() {
        1 | 2 => &[SeverityTier::Critical],
        3 => &[SeverityTier::Urgent, SeverityTier::Critical],
        _ => &[SeverityTier::Routine, SeverityTier::Urgent],
    };
    tiers.iter().flat_map(|&tier| tier_symptoms(tier)).collect()
}
