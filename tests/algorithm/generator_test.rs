use proptest::prelude::*;
use triage_ml::algorithm::rules::THRESHOLDS;
use triage_ml::algorithm::severity;
use triage_ml::{GeneratorConfig, SyntheticGenerator};

fn generate(rows: usize, seed: u64) -> Vec<triage_ml::TriageRecord> {
    SyntheticGenerator::new(GeneratorConfig {
        rows,
        seed: Some(seed),
        ..GeneratorConfig::default()
    })
    .generate()
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Every row stays inside the corpus value ranges
    #[test]
    fn prop_rows_in_range(seed in any::<u64>()) {
        for row in generate(100, seed) {
            prop_assert!((1..=5).contains(&row.triage_level));
            prop_assert!((60.0..=100.0).contains(&row.spo2));
            prop_assert!((1..=94).contains(&row.age));
        }
    }

    /// Escalation never makes a row less urgent than its symptom allows
    #[test]
    fn prop_escalation_only_lowers_level(seed in any::<u64>()) {
        for row in generate(100, seed) {
            let profile = severity::lookup(&row.symptom).unwrap();
            let least_urgent = profile.least_urgent_level().value();
            prop_assert!(row.triage_level <= least_urgent);
            if THRESHOLDS.has_alarming_vitals(&row.vitals()) {
                prop_assert!(row.triage_level <= (least_urgent - 1).max(1));
            }
        }
    }

    /// A seed fully determines the corpus
    #[test]
    fn prop_seeded_generation_is_reproducible(seed in any::<u64>()) {
        prop_assert_eq!(generate(20, seed), generate(20, seed));
    }
}

#[test]
fn test_every_symptom_appears_in_a_large_corpus() {
    let rows = generate(2_000, 42);
    for name in severity::symptom_names() {
        assert!(rows.iter().any(|r| r.symptom == name), "{name} never generated");
    }
}
