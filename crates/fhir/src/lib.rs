//! FHIR wire/boundary support for CUFF.
//!
//! This crate provides **wire models** for the clinical resources CUFF reads
//! from an upstream EHR, together with the helpers the correlation layer
//! needs:
//! - JSON bundle parsing with best-effort path diagnostics
//! - identity-key construction for encounter references and identifiers
//! - effective-timestamp extraction across the three FHIR effective[x] forms
//!
//! The structs here are deliberately **permissive**: upstream payloads carry
//! many fields CUFF does not model, and an unmodelled field must never fail a
//! fetch. Strict validation belongs to the application models built on top of
//! these, not to the wire layer.

pub mod adverse_event;
pub mod bundle;
pub mod encounter;
pub mod goal;
pub mod keys;
pub mod medication;
pub mod observation;
pub mod patient;
pub mod types;

// Re-export facades
pub use bundle::{Bundle, BundleEntry, KnownResource, Resource};

// Re-export public wire types
pub use adverse_event::AdverseEvent;
pub use encounter::Encounter;
pub use goal::{Goal, GoalTarget};
pub use medication::{MedicationRequest, MedicationStatement};
pub use observation::{Observation, ObservationComponent};
pub use patient::{HumanName, Patient};
pub use types::{CodeableConcept, Coding, Identifier, Period, Quantity, Reference};

/// Errors returned by the `cuff-fhir` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("translation error: {0}")]
    Translation(String),
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;

/// Parse a FHIR dateTime/instant string into a UTC timestamp.
///
/// Accepts the forms the upstream sources actually emit: a full RFC 3339
/// timestamp with offset, a local date-time without offset (interpreted as
/// UTC), and a bare date (interpreted as midnight UTC). Returns `None` for
/// anything else; callers decide whether a missing timestamp is fatal.
pub fn parse_instant(raw: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    None
}
