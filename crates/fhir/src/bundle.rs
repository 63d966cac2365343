//! Bundle wire model and parsing.
//!
//! A bundle is the unit of transfer from the upstream EHR: a flat list of
//! entries, each wrapping one resource. Parsing follows the same pattern as
//! the rest of the workspace's boundary code: `serde_path_to_error` wraps the
//! deserializer so a schema mismatch names the failing field instead of just
//! the failing byte offset.

use crate::adverse_event::AdverseEvent;
use crate::encounter::Encounter;
use crate::goal::Goal;
use crate::medication::{MedicationRequest, MedicationStatement};
use crate::observation::Observation;
use crate::patient::Patient;
use crate::{FhirError, FhirResult};
use serde::{Deserialize, Serialize};

/// A resource the correlation layer understands, tagged by `resourceType`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "resourceType")]
pub enum KnownResource {
    Observation(Observation),
    Encounter(Encounter),
    Patient(Patient),
    Goal(Goal),
    MedicationStatement(MedicationStatement),
    MedicationRequest(MedicationRequest),
    AdverseEvent(AdverseEvent),
}

/// Any bundle entry payload.
///
/// Resource types CUFF does not model, and modelled types whose payload does
/// not fit the wire struct, fall into `Other` and are skipped by the typed
/// iterators rather than failing the whole bundle.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Resource {
    Known(KnownResource),
    Other(serde_json::Value),
}

/// One entry of a bundle.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct BundleEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<Resource>,
}

/// A search-result bundle from the upstream EHR.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Bundle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub entry: Vec<BundleEntry>,
}

macro_rules! typed_iter {
    ($name:ident, $variant:ident, $doc:literal) => {
        #[doc = $doc]
        pub fn $name(&self) -> impl Iterator<Item = &$variant> {
            self.entry.iter().filter_map(|entry| match &entry.resource {
                Some(Resource::Known(KnownResource::$variant(resource))) => Some(resource),
                _ => None,
            })
        }
    };
}

impl Bundle {
    /// Parse a bundle from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::Translation`] naming the offending path when the
    /// JSON does not fit the bundle schema, or [`FhirError::InvalidInput`]
    /// when the payload parses but is not a Bundle resource.
    pub fn parse(json_text: &str) -> FhirResult<Self> {
        let mut deserializer = serde_json::Deserializer::from_str(json_text);

        let bundle = match serde_path_to_error::deserialize::<_, Bundle>(&mut deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(FhirError::Translation(format!(
                    "Bundle schema mismatch at {path}: {source}"
                )));
            }
        };

        if let Some(resource_type) = bundle.resource_type.as_deref() {
            if resource_type != "Bundle" {
                return Err(FhirError::InvalidInput(format!(
                    "Expected resourceType 'Bundle', got '{resource_type}'"
                )));
            }
        }

        Ok(bundle)
    }

    /// An empty bundle: the typed representation of "legitimately no data".
    pub fn empty() -> Self {
        Self {
            resource_type: Some("Bundle".to_string()),
            total: Some(0),
            entry: Vec::new(),
        }
    }

    /// Whether this bundle carries no entries at all.
    pub fn is_empty(&self) -> bool {
        self.entry.iter().all(|entry| entry.resource.is_none())
    }

    typed_iter!(observations, Observation, "All observation entries.");
    typed_iter!(encounters, Encounter, "All encounter entries.");
    typed_iter!(patients, Patient, "All patient entries.");
    typed_iter!(goals, Goal, "All goal entries.");
    typed_iter!(
        medication_statements,
        MedicationStatement,
        "All medication-statement entries."
    );
    typed_iter!(
        medication_requests,
        MedicationRequest,
        "All medication-request entries."
    );
    typed_iter!(adverse_events, AdverseEvent, "All adverse-event entries.");
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIXED_BUNDLE: &str = r#"{
        "resourceType": "Bundle",
        "type": "searchset",
        "total": 4,
        "entry": [
            {"resource": {"resourceType": "Encounter", "id": "e-1", "status": "finished"}},
            {"resource": {"resourceType": "Observation", "id": "o-1",
                          "code": {"coding": [{"system": "http://loinc.org", "code": "55284-4"}]},
                          "encounter": {"reference": "Encounter/e-1"},
                          "effectiveDateTime": "2024-05-02T09:30:00Z"}},
            {"resource": {"resourceType": "Provenance", "id": "prov-1"}},
            {"resource": {"resourceType": "Patient", "id": "p-1"}}
        ]
    }"#;

    #[test]
    fn parses_mixed_bundle_and_partitions_by_type() {
        let bundle = Bundle::parse(MIXED_BUNDLE).expect("parse");
        assert_eq!(bundle.encounters().count(), 1);
        assert_eq!(bundle.observations().count(), 1);
        assert_eq!(bundle.patients().count(), 1);
        // Provenance is unmodelled; it lands in Resource::Other silently.
        assert_eq!(bundle.entry.len(), 4);
    }

    #[test]
    fn rejects_non_bundle_resource_type() {
        let err = Bundle::parse(r#"{"resourceType": "OperationOutcome"}"#)
            .expect_err("should reject non-bundle");
        match err {
            FhirError::InvalidInput(msg) => {
                assert!(msg.contains("OperationOutcome"));
            }
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn schema_mismatch_reports_path() {
        let err = Bundle::parse(r#"{"resourceType": "Bundle", "entry": "not-a-list"}"#)
            .expect_err("should reject wrong type");
        match err {
            FhirError::Translation(msg) => {
                assert!(msg.contains("entry"));
            }
            other => panic!("expected Translation, got {other:?}"),
        }
    }

    #[test]
    fn empty_bundle_is_empty() {
        assert!(Bundle::empty().is_empty());
        let bundle = Bundle::parse(r#"{"resourceType": "Bundle", "total": 0}"#).expect("parse");
        assert!(bundle.is_empty());
    }

    #[test]
    fn malformed_known_resource_degrades_to_other() {
        // "component" must be a list; this observation payload is malformed,
        // so the entry degrades to Other instead of failing the bundle.
        let bundle = Bundle::parse(
            r#"{"resourceType": "Bundle", "entry": [
                {"resource": {"resourceType": "Observation", "id": "o-bad", "component": 17}}
            ]}"#,
        )
        .expect("parse");
        assert_eq!(bundle.observations().count(), 0);
        assert_eq!(bundle.entry.len(), 1);
    }
}
