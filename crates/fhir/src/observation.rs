//! Observation wire model.
//!
//! An observation is the raw input unit of correlation: it carries a coded
//! concept, an effective timestamp in one of three forms, an optional owning
//! encounter reference, and (for panel-style observations) component
//! readings with their own codes and quantities.

use crate::types::{CodeableConcept, Coding, Period, Quantity, Reference};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One component of a panel observation (e.g. the systolic half of a
/// blood-pressure panel).
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ObservationComponent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeableConcept>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_quantity: Option<Quantity>,
}

/// A clinical observation as fetched from the upstream EHR.
///
/// Immutable once fetched; the correlation layer only reads it.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Observation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeableConcept>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encounter: Option<Reference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_instant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_period: Option<Period>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub component: Vec<ObservationComponent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_quantity: Option<Quantity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_codeable_concept: Option<CodeableConcept>,
}

impl Observation {
    /// Whether this observation's code carries any of the candidate codings.
    pub fn has_coding(&self, candidates: &[Coding]) -> bool {
        self.code
            .as_ref()
            .is_some_and(|code| code.has_coding(candidates))
    }

    /// The raw effective timestamp string, exactly as transmitted.
    ///
    /// Precedence: `effectiveDateTime`, then `effectiveInstant`, then the
    /// end of `effectivePeriod`. The raw string is the grouping key for
    /// orphan pairing, so it is surfaced unmodified, with no normalisation.
    pub fn effective_raw(&self) -> Option<&str> {
        self.effective_date_time
            .as_deref()
            .or(self.effective_instant.as_deref())
            .or_else(|| self.effective_period.as_ref().and_then(|p| p.end.as_deref()))
    }

    /// The effective timestamp parsed to UTC, if present and parseable.
    pub fn effective_instant_utc(&self) -> Option<DateTime<Utc>> {
        self.effective_raw().and_then(crate::parse_instant)
    }

    /// The value quantity of the first component whose code carries any of
    /// the candidate codings.
    pub fn component_quantity(&self, candidates: &[Coding]) -> Option<&Quantity> {
        self.component.iter().find_map(|component| {
            let matches = component
                .code
                .as_ref()
                .is_some_and(|code| code.has_coding(candidates));
            if matches {
                component.value_quantity.as_ref()
            } else {
                None
            }
        })
    }

    /// The id for log lines, tolerating upstream records without one.
    pub fn display_id(&self) -> &str {
        self.id.as_deref().unwrap_or("<no id>")
    }
}
