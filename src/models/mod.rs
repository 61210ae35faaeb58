//! Domain models for the triage pipeline
//!
//! Corpus rows, urgency levels, and the request/response shapes of the
//! inference boundary.

pub mod level;
pub mod record;
pub mod request;

// Re-export commonly used types
pub use level::{Category, TriageLevel, urgency_score};
pub use record::{Gender, TriageRecord, Vitals};
pub use request::{RequestVitals, TriageAssessment, TriageRequest, TriageResponse};
