//! Bundle-to-model assembly.
//!
//! Each function turns a fetched bundle into a list of application models.
//! The rule throughout: a malformed individual record is logged and skipped,
//! a missing whole collection is an error for the caller to surface.

use crate::config::CodingConfig;
use crate::model::{AdverseEventModel, GoalModel, MedicationModel, PatientModel};
use crate::{CoreError, CoreResult};
use cuff_fhir::Bundle;

/// The patient demographics record. Exactly one patient resource is
/// expected; its absence is an error, not an empty collection.
pub(crate) fn build_patient(bundle: &Bundle) -> CoreResult<PatientModel> {
    let resource = bundle
        .patients()
        .next()
        .ok_or(CoreError::MissingResource("patient"))?;
    PatientModel::from_resource(resource)
}

/// Current goals: the EHR's goal resources plus goals held locally.
pub(crate) fn build_goals(
    bundle: &Bundle,
    local: Vec<GoalModel>,
    config: &CodingConfig,
) -> Vec<GoalModel> {
    let mut goals = Vec::new();
    for resource in bundle.goals() {
        match GoalModel::from_resource(resource, config) {
            Ok(goal) => goals.push(goal),
            Err(err) => tracing::warn!(
                goal = resource.id.as_deref().unwrap_or("<no id>"),
                %err,
                "skipping goal"
            ),
        }
    }
    goals.extend(local);
    goals
}

/// Adverse events recorded against the patient.
pub(crate) fn build_adverse_events(bundle: &Bundle) -> Vec<AdverseEventModel> {
    let mut events = Vec::new();
    for resource in bundle.adverse_events() {
        match AdverseEventModel::from_resource(resource) {
            Ok(event) => events.push(event),
            Err(err) => tracing::warn!(
                adverse_event = resource.id.as_deref().unwrap_or("<no id>"),
                %err,
                "skipping adverse event"
            ),
        }
    }
    events
}

/// Medications assembled from both upstream sources: statements (what the
/// patient reports) and requests (what was prescribed).
pub(crate) fn build_medications(statements: &Bundle, requests: &Bundle) -> Vec<MedicationModel> {
    let mut medications = Vec::new();
    for resource in statements.medication_statements() {
        match MedicationModel::from_statement(resource) {
            Ok(medication) => medications.push(medication),
            Err(err) => tracing::warn!(
                statement = resource.id.as_deref().unwrap_or("<no id>"),
                %err,
                "skipping medication statement"
            ),
        }
    }
    for resource in requests.medication_requests() {
        match MedicationModel::from_request(resource) {
            Ok(medication) => medications.push(medication),
            Err(err) => tracing::warn!(
                request = resource.id.as_deref().unwrap_or("<no id>"),
                %err,
                "skipping medication request"
            ),
        }
    }
    medications
}
