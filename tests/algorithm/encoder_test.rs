use proptest::prelude::*;
use triage_ml::algorithm::encoder::{GenderEncoder, SymptomEncoder, UNKNOWN_GENDER_CODE};
use triage_ml::algorithm::severity::{self, DEFAULT_SYMPTOM};

fn vocabulary() -> SymptomEncoder {
    SymptomEncoder::fit(severity::symptom_names()).unwrap()
}

proptest! {
    /// Anything outside the canonical pair gets the default code
    #[test]
    fn prop_non_canonical_gender_gets_default(value in "\\PC*") {
        prop_assume!(value != "Male" && value != "Female");
        let encoder = GenderEncoder::fit().unwrap();
        prop_assert_eq!(encoder.encode(&value), UNKNOWN_GENDER_CODE);
    }

    /// Unknown symptoms never fail and encode as the default symptom
    #[test]
    fn prop_symptom_fallback_is_total(value in "\\PC*") {
        let encoder = vocabulary();
        let resolved = encoder.resolve(&value).unwrap();
        if encoder.inner().contains(&value) {
            prop_assert_eq!(resolved.name, value);
        } else {
            prop_assert!(resolved.fell_back);
            prop_assert_eq!(resolved.code, encoder.encode_known(DEFAULT_SYMPTOM).unwrap());
        }
    }
}

#[test]
fn test_gender_encoding_is_pure() {
    let encoder = GenderEncoder::fit().unwrap();
    let male = encoder.encode("Male");
    for _ in 0..10 {
        assert_eq!(encoder.encode("Male"), male);
    }
    assert_ne!(encoder.encode("Female"), male);
}

#[test]
fn test_decode_inverts_encode() {
    let encoder = vocabulary();
    for name in severity::symptom_names() {
        let code = encoder.encode_known(name).unwrap();
        assert_eq!(encoder.inner().decode(code).unwrap(), name);
    }
}

#[test]
fn test_gender_decode_inverts_encode() {
    let encoder = GenderEncoder::fit().unwrap();
    let classes = encoder.inner().classes();
    assert_eq!(classes, ["Female", "Male", "Other"]);

    for class in classes {
        let code = encoder.inner().encode(class).unwrap();
        assert_eq!(encoder.inner().decode(code).unwrap(), class);
    }
    for canonical in ["Female", "Male"] {
        assert_eq!(encoder.inner().decode(encoder.encode(canonical)).unwrap(), canonical);
    }
    // The reserved class is never produced by request encoding
    assert_eq!(encoder.encode("Other"), UNKNOWN_GENDER_CODE);
}
