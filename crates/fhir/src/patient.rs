//! Patient wire model.
//!
//! Only the demographics CUFF surfaces are modelled; everything else in the
//! upstream resource is ignored.

use serde::{Deserialize, Serialize};

/// A human name as transmitted upstream.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct HumanName {
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub given: Vec<String>,
}

/// Patient demographics.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Patient {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<HumanName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

impl Patient {
    /// "Given Family" from the first transmitted name, if any.
    pub fn display_name(&self) -> Option<String> {
        let name = self.name.first()?;
        let mut parts: Vec<&str> = name.given.iter().map(String::as_str).collect();
        if let Some(family) = name.family.as_deref() {
            parts.push(family);
        }
        if parts.is_empty() {
            return None;
        }
        Some(parts.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_joins_given_and_family() {
        let p: Patient = serde_json::from_str(
            r#"{"resourceType": "Patient", "id": "p-1",
                "name": [{"family": "Rivera", "given": ["Ana", "Luz"]}],
                "birthDate": "1962-10-04"}"#,
        )
        .expect("parse");
        assert_eq!(p.display_name().as_deref(), Some("Ana Luz Rivera"));
    }

    #[test]
    fn display_name_absent_when_no_names() {
        assert!(Patient::default().display_name().is_none());
    }
}
