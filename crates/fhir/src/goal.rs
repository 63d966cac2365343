//! Goal wire model.

use crate::types::{CodeableConcept, Quantity};
use serde::{Deserialize, Serialize};

/// One target of a goal, e.g. "systolic under 130 mmHg".
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct GoalTarget {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measure: Option<CodeableConcept>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail_quantity: Option<Quantity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

/// A care goal as fetched from the upstream EHR.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Goal {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifecycle_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub achievement_status: Option<CodeableConcept>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<CodeableConcept>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_date: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub target: Vec<GoalTarget>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bp_goal_with_two_targets() {
        let g: Goal = serde_json::from_str(
            r#"{"resourceType": "Goal", "id": "g-1",
                "lifecycleStatus": "active",
                "description": {"text": "Blood pressure below 130/80"},
                "target": [
                    {"measure": {"coding": [{"system": "http://loinc.org", "code": "8480-6"}]},
                     "detailQuantity": {"value": 130, "unit": "mmHg"}},
                    {"measure": {"coding": [{"system": "http://loinc.org", "code": "8462-4"}]},
                     "detailQuantity": {"value": 80, "unit": "mmHg"}}
                ]}"#,
        )
        .expect("parse");
        assert_eq!(g.target.len(), 2);
        assert_eq!(g.lifecycle_status.as_deref(), Some("active"));
    }
}
