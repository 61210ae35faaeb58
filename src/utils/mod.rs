//! Shared helpers for the triage pipeline

pub mod logging;
