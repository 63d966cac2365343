//! AdverseEvent wire model.

use crate::types::CodeableConcept;
use serde::{Deserialize, Serialize};

/// An adverse event recorded against the patient.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AdverseEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<CodeableConcept>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_event_concept() {
        let e: AdverseEvent = serde_json::from_str(
            r#"{"resourceType": "AdverseEvent", "id": "ae-1",
                "event": {"coding": [{"system": "http://snomed.info/sct",
                                      "code": "271594007", "display": "Syncope"}]},
                "date": "2024-03-01T08:00:00Z"}"#,
        )
        .expect("parse");
        assert_eq!(e.event.expect("event").label(), Some("Syncope"));
    }
}
