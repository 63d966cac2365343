//! Shared FHIR element types.
//!
//! These are the small building blocks (codings, quantities, references)
//! embedded in every resource. All fields are optional because upstream data
//! routinely omits them; matching helpers treat missing fields as
//! non-matching rather than erroring.

use serde::{Deserialize, Serialize};

/// A single system+code pair.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Coding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Coding {
    /// Construct a coding from a system and code.
    pub fn new(system: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            code: Some(code.into()),
            display: None,
        }
    }

    /// Whether this coding satisfies `candidate`.
    ///
    /// The code must be present on both sides and equal. If the candidate
    /// carries a system it must also be present and equal; a candidate with
    /// no system matches any system.
    pub fn satisfies(&self, candidate: &Coding) -> bool {
        let code_matches = match (&self.code, &candidate.code) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        };
        if !code_matches {
            return false;
        }
        match &candidate.system {
            Some(wanted) => self.system.as_deref() == Some(wanted.as_str()),
            None => true,
        }
    }
}

/// A concept expressed as zero or more codings plus free text.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CodeableConcept {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub coding: Vec<Coding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl CodeableConcept {
    /// Whether any coding on this concept satisfies any of the candidates.
    pub fn has_coding(&self, candidates: &[Coding]) -> bool {
        self.coding
            .iter()
            .any(|c| candidates.iter().any(|wanted| c.satisfies(wanted)))
    }

    /// Best-effort human-readable label: the text, else the first display,
    /// else the first code.
    pub fn label(&self) -> Option<&str> {
        if let Some(text) = self.text.as_deref() {
            return Some(text);
        }
        for coding in &self.coding {
            if let Some(display) = coding.display.as_deref() {
                return Some(display);
            }
        }
        self.coding.first().and_then(|c| c.code.as_deref())
    }
}

/// A measured amount with an optional unit.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Quantity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// A business identifier (distinct from the resource's logical id).
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Identifier {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// A pointer from one resource to another.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Reference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<Identifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// A time interval with string-typed boundaries, as transmitted upstream.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Period {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}
