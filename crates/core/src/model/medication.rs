//! Flat medication model.
//!
//! Medications are assembled from two upstream resource types; the model
//! remembers which one it came from and keeps its codings so the workspace
//! can partition the list against a configured concept set.

use crate::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use cuff_fhir::Coding;
use serde::{Deserialize, Serialize};

/// Which upstream resource a medication came from.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MedicationSource {
    Statement,
    Request,
}

/// A medication surfaced to the application.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct MedicationModel {
    pub id: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub effective: Option<DateTime<Utc>>,
    /// Codings retained for concept-set matching.
    pub codings: Vec<Coding>,
    pub source: MedicationSource,
}

impl MedicationModel {
    /// Build from a patient-reported medication statement.
    pub fn from_statement(statement: &cuff_fhir::MedicationStatement) -> CoreResult<Self> {
        let id = statement.id.clone().ok_or_else(|| {
            CoreError::MalformedRecord("medication statement without an id".to_string())
        })?;
        let concept = statement.medication_codeable_concept.as_ref();
        Ok(Self {
            id,
            description: concept.and_then(|c| c.label()).map(str::to_string),
            status: statement.status.clone(),
            effective: statement
                .effective_date_time
                .as_deref()
                .and_then(cuff_fhir::parse_instant),
            codings: concept.map(|c| c.coding.clone()).unwrap_or_default(),
            source: MedicationSource::Statement,
        })
    }

    /// Build from a prescription order. The medication may be expressed as a
    /// concept or as a reference; a request carrying neither is malformed.
    pub fn from_request(request: &cuff_fhir::MedicationRequest) -> CoreResult<Self> {
        let id = request.id.clone().ok_or_else(|| {
            CoreError::MalformedRecord("medication request without an id".to_string())
        })?;
        let concept = request.medication_codeable_concept.as_ref();
        let description = concept
            .and_then(|c| c.label())
            .map(str::to_string)
            .or_else(|| {
                request
                    .medication_reference
                    .as_ref()
                    .and_then(|r| r.display.clone())
            });
        if concept.is_none() && description.is_none() {
            return Err(CoreError::MalformedRecord(format!(
                "medication request {id} carries neither concept nor reference display"
            )));
        }
        Ok(Self {
            id,
            description,
            status: request.status.clone(),
            effective: request
                .authored_on
                .as_deref()
                .and_then(cuff_fhir::parse_instant),
            codings: concept.map(|c| c.coding.clone()).unwrap_or_default(),
            source: MedicationSource::Request,
        })
    }

    /// Whether any of this medication's codings satisfies any candidate.
    pub fn matches_any(&self, candidates: &[Coding]) -> bool {
        self.codings
            .iter()
            .any(|coding| candidates.iter().any(|wanted| coding.satisfies(wanted)))
    }
}
