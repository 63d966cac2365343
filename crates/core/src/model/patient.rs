//! Flat patient demographics model.

use crate::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// The demographics the application surfaces.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct PatientModel {
    /// Upstream logical id.
    pub id: String,
    pub name: Option<String>,
    pub birth_date: Option<String>,
    pub gender: Option<String>,
}

impl PatientModel {
    /// Build from the wire resource; the logical id is required.
    pub fn from_resource(patient: &cuff_fhir::Patient) -> CoreResult<Self> {
        let id = patient
            .id
            .clone()
            .ok_or_else(|| CoreError::MalformedRecord("patient without an id".to_string()))?;
        Ok(Self {
            id,
            name: patient.display_name(),
            birth_date: patient.birth_date.clone(),
            gender: patient.gender.clone(),
        })
    }
}
