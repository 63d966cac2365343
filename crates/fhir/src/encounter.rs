//! Encounter wire model.

use crate::keys;
use crate::types::{Identifier, Period};
use serde::{Deserialize, Serialize};

/// A clinical visit record; the anchor used to group related observations.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Encounter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<Identifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<Period>,
}

impl Encounter {
    /// Every identity key this encounter answers to: logical-id forms plus
    /// one key per business identifier. See [`crate::keys`].
    pub fn keys(&self) -> Vec<String> {
        keys::encounter_keys(self.id.as_deref(), &self.identifier)
    }

    /// The id for log lines, tolerating upstream records without one.
    pub fn display_id(&self) -> &str {
        self.id.as_deref().unwrap_or("<no id>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_combine_id_and_identifiers() {
        let e = Encounter {
            id: Some("e-1".into()),
            identifier: vec![Identifier {
                system: Some("urn:visit".into()),
                value: Some("V-1".into()),
            }],
            ..Encounter::default()
        };
        assert_eq!(e.keys(), vec!["Encounter/e-1", "e-1", "urn:visit|V-1"]);
    }

    #[test]
    fn encounter_without_identity_has_no_keys() {
        assert!(Encounter::default().keys().is_empty());
    }
}
