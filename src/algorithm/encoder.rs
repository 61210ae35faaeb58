//! Categorical feature encoding
//!
//! A [`CategoryEncoder`] maps category strings to integer codes. Codes are
//! assigned in sorted order of the fitted classes, so the same class set
//! always yields the same codes. Encoders are fitted once over the fully
//! merged corpus and never mutated afterwards; inference receives them
//! explicitly through [`FeatureEncoder`].
//!
//! Fallbacks at inference:
//!
//! * gender outside {"Male", "Female"} encodes to [`UNKNOWN_GENDER_CODE`];
//! * a symptom never seen in training encodes as [`DEFAULT_SYMPTOM`];
//! * heart rate is not collected and is always [`INFERENCE_HEART_RATE`].

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::algorithm::severity::{DEFAULT_SYMPTOM, EMPTY_SYMPTOMS_SENTINEL};
use crate::error::{Result, TriageError};
use crate::models::{Gender, TriageRecord, TriageRequest, Vitals};
use crate::schema::FeatureRow;

/// Code used for any gender outside {"Male", "Female"} at inference
pub const UNKNOWN_GENDER_CODE: u32 = 0;

/// Heart rate fed to the classifier at inference; the request schema does
/// not carry one
pub const INFERENCE_HEART_RATE: f64 = 80.0;

/// Gender substituted for non-canonical values before training
pub const TRAINING_GENDER_DEFAULT: Gender = Gender::Male;

/// Persisted form of an encoder
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EncoderState {
    field: String,
    classes: Vec<String>,
}

/// Bidirectional mapping between category strings and integer codes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "EncoderState", into = "EncoderState")]
pub struct CategoryEncoder {
    field: String,
    classes: Vec<String>,
    index: FxHashMap<String, u32>,
}

impl CategoryEncoder {
    /// Fit an encoder over every value of a field
    pub fn fit<I, S>(field: &str, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let classes: BTreeSet<String> = values
            .into_iter()
            .map(|v| v.as_ref().to_string())
            .collect();
        if classes.is_empty() {
            return Err(TriageError::Encoding(format!(
                "cannot fit '{field}' encoder on an empty column"
            )));
        }
        Ok(Self::from_sorted(field.to_string(), classes.into_iter().collect()))
    }

    fn from_sorted(field: String, classes: Vec<String>) -> Self {
        let index = classes
            .iter()
            .enumerate()
            .map(|(code, class)| (class.clone(), code as u32))
            .collect();
        Self {
            field,
            classes,
            index,
        }
    }

    /// Field this encoder was fitted for
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Fitted classes, in code order
    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Whether a value was seen during fitting
    #[must_use]
    pub fn contains(&self, value: &str) -> bool {
        self.index.contains_key(value)
    }

    /// Code of a fitted value, or `None` when it was never seen
    #[must_use]
    pub fn try_encode(&self, value: &str) -> Option<u32> {
        self.index.get(value).copied()
    }

    /// Code of a fitted value, failing when it was never seen
    pub fn encode(&self, value: &str) -> Result<u32> {
        self.try_encode(value).ok_or_else(|| {
            TriageError::Encoding(format!("unseen {} value '{value}'", self.field))
        })
    }

    /// Class of a code
    pub fn decode(&self, code: u32) -> Result<&str> {
        self.classes
            .get(code as usize)
            .map(String::as_str)
            .ok_or_else(|| TriageError::Encoding(format!("unknown {} code {code}", self.field)))
    }
}

impl TryFrom<EncoderState> for CategoryEncoder {
    type Error = String;

    fn try_from(state: EncoderState) -> std::result::Result<Self, Self::Error> {
        if state.classes.is_empty() {
            return Err(format!("encoder '{}' has no classes", state.field));
        }
        if state.classes.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(format!(
                "encoder '{}' classes are not sorted and unique",
                state.field
            ));
        }
        Ok(Self::from_sorted(state.field, state.classes))
    }
}

impl From<CategoryEncoder> for EncoderState {
    fn from(encoder: CategoryEncoder) -> Self {
        Self {
            field: encoder.field,
            classes: encoder.classes,
        }
    }
}

/// Encoder for the gender feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenderEncoder(CategoryEncoder);

impl GenderEncoder {
    /// Field name of the gender column
    pub const FIELD: &'static str = "gender";

    /// Fit over both canonical genders plus the reserved label.
    ///
    /// The class set does not depend on the corpus, so the code space stays
    /// the same across regenerations.
    pub fn fit() -> Result<Self> {
        let labels = Gender::ALL
            .iter()
            .map(|g| g.as_str())
            .chain(std::iter::once(Gender::RESERVED_LABEL));
        CategoryEncoder::fit(Self::FIELD, labels).map(Self)
    }

    /// Map a raw training value onto the canonical set
    #[must_use]
    pub fn coerce_for_training(value: &str) -> Gender {
        Gender::from_canonical(value).unwrap_or(TRAINING_GENDER_DEFAULT)
    }

    /// Encode a gender value; non-canonical values get [`UNKNOWN_GENDER_CODE`]
    #[must_use]
    pub fn encode(&self, value: &str) -> u32 {
        Gender::from_canonical(value)
            .and_then(|gender| self.0.try_encode(gender.as_str()))
            .unwrap_or(UNKNOWN_GENDER_CODE)
    }

    /// Underlying category encoder
    #[must_use]
    pub const fn inner(&self) -> &CategoryEncoder {
        &self.0
    }

    /// Check a loaded encoder covers both canonical genders
    pub fn validate(&self) -> Result<()> {
        if self.0.field() != Self::FIELD {
            return Err(TriageError::Encoding(format!(
                "expected a '{}' encoder, found '{}'",
                Self::FIELD,
                self.0.field()
            )));
        }
        for gender in Gender::ALL {
            if !self.0.contains(gender.as_str()) {
                return Err(TriageError::Encoding(format!(
                    "gender encoder is missing '{gender}'"
                )));
            }
        }
        Ok(())
    }
}

/// A symptom resolved against the fitted vocabulary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSymptom {
    /// Encoded value
    pub code: u32,
    /// Symptom the code stands for
    pub name: String,
    /// Whether the default symptom was substituted
    pub fell_back: bool,
}

/// Encoder for the symptom feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymptomEncoder(CategoryEncoder);

impl SymptomEncoder {
    /// Field name of the symptom column
    pub const FIELD: &'static str = "symptom";

    /// Fit over every symptom in the corpus, plus the default symptom so the
    /// fallback is always encodable
    pub fn fit<I, S>(symptoms: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let symptoms: Vec<String> = symptoms
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .chain(std::iter::once(DEFAULT_SYMPTOM.to_string()))
            .collect();
        CategoryEncoder::fit(Self::FIELD, symptoms).map(Self)
    }

    /// Encode a symptom seen during training
    pub fn encode_known(&self, symptom: &str) -> Result<u32> {
        self.0.encode(symptom)
    }

    /// Encode a symptom, substituting [`DEFAULT_SYMPTOM`] when unseen
    pub fn resolve(&self, symptom: &str) -> Result<ResolvedSymptom> {
        if let Some(code) = self.0.try_encode(symptom) {
            return Ok(ResolvedSymptom {
                code,
                name: symptom.to_string(),
                fell_back: false,
            });
        }

        log::debug!("Unknown symptom '{symptom}', encoding as '{DEFAULT_SYMPTOM}'");
        Ok(ResolvedSymptom {
            code: self.0.encode(DEFAULT_SYMPTOM)?,
            name: DEFAULT_SYMPTOM.to_string(),
            fell_back: true,
        })
    }

    /// Underlying category encoder
    #[must_use]
    pub const fn inner(&self) -> &CategoryEncoder {
        &self.0
    }

    /// Check a loaded encoder can serve the fallback
    pub fn validate(&self) -> Result<()> {
        if self.0.field() != Self::FIELD {
            return Err(TriageError::Encoding(format!(
                "expected a '{}' encoder, found '{}'",
                Self::FIELD,
                self.0.field()
            )));
        }
        if !self.0.contains(DEFAULT_SYMPTOM) {
            return Err(TriageError::Encoding(format!(
                "symptom encoder is missing the fallback symptom '{DEFAULT_SYMPTOM}'"
            )));
        }
        Ok(())
    }
}

/// A request encoded for the classifier, with what the explanation needs
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRequest {
    /// Model input
    pub features: FeatureRow,
    /// Symptom the features encode (after fallback)
    pub symptom: ResolvedSymptom,
}

impl EncodedRequest {
    /// Raw vitals carried by the encoded features
    #[must_use]
    pub fn vitals(&self) -> Vitals {
        Vitals {
            temperature: self.features.temperature,
            heart_rate: self.features.heart_rate,
            spo2: self.features.spo2,
            systolic_bp: self.features.systolic_bp,
        }
    }
}

/// Both categorical encoders, shared by training and inference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureEncoder {
    /// Gender encoder
    pub gender: GenderEncoder,
    /// Symptom encoder
    pub symptom: SymptomEncoder,
}

impl FeatureEncoder {
    /// Fit both encoders over the final merged corpus
    pub fn fit(records: &[TriageRecord]) -> Result<Self> {
        if records.is_empty() {
            return Err(TriageError::Encoding(
                "cannot fit encoders on an empty corpus".to_string(),
            ));
        }
        Ok(Self {
            gender: GenderEncoder::fit()?,
            symptom: SymptomEncoder::fit(records.iter().map(|r| r.symptom.as_str()))?,
        })
    }

    /// Encode a training row
    pub fn encode_record(&self, record: &TriageRecord) -> Result<FeatureRow> {
        let gender = GenderEncoder::coerce_for_training(&record.gender);
        Ok(FeatureRow {
            age: f64::from(record.age),
            gender_code: self.gender.encode(gender.as_str()),
            symptom_code: self.symptom.encode_known(&record.symptom)?,
            temperature: record.temperature,
            heart_rate: f64::from(record.heart_rate),
            spo2: record.spo2,
            systolic_bp: f64::from(record.systolic_bp),
        })
    }

    /// Encode an inference request, applying every documented fallback
    pub fn encode_request(&self, request: &TriageRequest) -> Result<EncodedRequest> {
        let primary = request
            .symptoms
            .first()
            .map_or(EMPTY_SYMPTOMS_SENTINEL, String::as_str);
        let symptom = self.symptom.resolve(primary)?;

        let features = FeatureRow {
            age: f64::from(request.age),
            gender_code: self.gender.encode(&request.gender),
            symptom_code: symptom.code,
            temperature: request.vitals.temperature_or_default(),
            heart_rate: INFERENCE_HEART_RATE,
            spo2: request.vitals.spo2_or_default(),
            systolic_bp: f64::from(request.vitals.systolic_bp_or_default()),
        };

        Ok(EncodedRequest { features, symptom })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RequestVitals;

    fn symptom_encoder() -> SymptomEncoder {
        SymptomEncoder::fit(["Cough", "Chest Pain", "Headache", "Cough"]).unwrap()
    }

    fn request(gender: &str, symptoms: &[&str]) -> TriageRequest {
        TriageRequest {
            age: 30,
            gender: gender.to_string(),
            symptoms: symptoms.iter().map(|s| s.to_string()).collect(),
            vitals: RequestVitals::default(),
        }
    }

    #[test]
    fn test_codes_follow_sorted_classes() {
        let encoder = CategoryEncoder::fit("x", ["b", "a", "c", "a"]).unwrap();
        assert_eq!(encoder.classes(), &["a", "b", "c"]);
        assert_eq!(encoder.encode("a").unwrap(), 0);
        assert_eq!(encoder.encode("c").unwrap(), 2);
        assert!(encoder.encode("d").is_err());
        assert!(encoder.decode(3).is_err());
    }

    #[test]
    fn test_empty_fit_fails() {
        assert!(CategoryEncoder::fit("x", Vec::<String>::new()).is_err());
    }

    #[test]
    fn test_gender_encoder_code_space() {
        let encoder = GenderEncoder::fit().unwrap();
        assert_eq!(encoder.inner().classes(), &["Female", "Male", "Other"]);
        assert_eq!(encoder.encode("Female"), 0);
        assert_eq!(encoder.encode("Male"), 1);
        assert_eq!(encoder.encode("Male"), encoder.encode("Male"));
        assert_eq!(encoder.encode("Other"), UNKNOWN_GENDER_CODE);
        assert_eq!(encoder.encode("male"), UNKNOWN_GENDER_CODE);
        assert_eq!(encoder.encode(""), UNKNOWN_GENDER_CODE);
    }

    #[test]
    fn test_training_gender_coercion() {
        assert_eq!(GenderEncoder::coerce_for_training("Female"), Gender::Female);
        assert_eq!(GenderEncoder::coerce_for_training("Unknown"), Gender::Male);
    }

    #[test]
    fn test_symptom_fallback() {
        let encoder = symptom_encoder();
        let known = encoder.resolve("Chest Pain").unwrap();
        assert!(!known.fell_back);
        assert_eq!(known.name, "Chest Pain");

        let unknown = encoder.resolve("Fever").unwrap();
        assert!(unknown.fell_back);
        assert_eq!(unknown.name, DEFAULT_SYMPTOM);
        assert_eq!(unknown.code, encoder.encode_known(DEFAULT_SYMPTOM).unwrap());
    }

    #[test]
    fn test_fallback_symptom_always_fitted() {
        let encoder = SymptomEncoder::fit(["Cough"]).unwrap();
        assert!(encoder.validate().is_ok());
        assert!(encoder.resolve("Anything").is_ok());
    }

    #[test]
    fn test_round_trip() {
        let encoder = symptom_encoder();
        for class in encoder.inner().classes() {
            let code = encoder.encode_known(class).unwrap();
            assert_eq!(encoder.inner().decode(code).unwrap(), class);
        }
    }

    #[test]
    fn test_serde_preserves_codes() {
        let encoder = symptom_encoder();
        let json = serde_json::to_string(&encoder).unwrap();
        let loaded: SymptomEncoder = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, encoder);
        assert_eq!(loaded.encode_known("Cough").unwrap(), encoder.encode_known("Cough").unwrap());
    }

    #[test]
    fn test_unsorted_state_is_rejected() {
        let json = r#"{"field":"symptom","classes":["b","a"]}"#;
        assert!(serde_json::from_str::<SymptomEncoder>(json).is_err());
    }

    #[test]
    fn test_request_uses_first_symptom_and_fixed_heart_rate() {
        let encoder = FeatureEncoder {
            gender: GenderEncoder::fit().unwrap(),
            symptom: symptom_encoder(),
        };
        let encoded = encoder
            .encode_request(&request("Male", &["Chest Pain", "Cough"]))
            .unwrap();
        assert_eq!(encoded.symptom.name, "Chest Pain");
        assert_eq!(encoded.features.heart_rate, INFERENCE_HEART_RATE);
        assert_eq!(encoded.features.systolic_bp, 120.0);
        assert_eq!(encoded.features.temperature, 37.0);
        assert_eq!(encoded.features.spo2, 98.0);
    }

    #[test]
    fn test_empty_symptom_list_uses_sentinel_then_fallback() {
        let encoder = FeatureEncoder {
            gender: GenderEncoder::fit().unwrap(),
            symptom: symptom_encoder(),
        };
        let encoded = encoder.encode_request(&request("Female", &[])).unwrap();
        assert!(encoded.symptom.fell_back);
        assert_eq!(encoded.symptom.name, DEFAULT_SYMPTOM);
    }
}
