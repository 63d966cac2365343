//! Flat adverse-event model.

use crate::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An adverse event surfaced to the application.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct AdverseEventModel {
    pub id: String,
    pub description: Option<String>,
    /// Concept code/system of the event, when coded.
    pub concept_code: Option<String>,
    pub concept_system: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

impl AdverseEventModel {
    /// Build from the wire resource; the logical id is required.
    pub fn from_resource(event: &cuff_fhir::AdverseEvent) -> CoreResult<Self> {
        let id = event
            .id
            .clone()
            .ok_or_else(|| CoreError::MalformedRecord("adverse event without an id".to_string()))?;
        let concept = event.event.as_ref();
        let first_coding = concept.and_then(|c| c.coding.first());
        Ok(Self {
            id,
            description: concept.and_then(|c| c.label()).map(str::to_string),
            concept_code: first_coding.and_then(|c| c.code.clone()),
            concept_system: first_coding.and_then(|c| c.system.clone()),
            date: event.date.as_deref().and_then(cuff_fhir::parse_instant),
        })
    }
}
