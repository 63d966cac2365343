//! A measured amount with its unit.

use crate::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// A value+unit pair lifted out of a wire quantity.
///
/// Unlike the wire form, the value is mandatory: a quantity without a value
/// cannot participate in a reading.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Quantity {
    pub value: f64,
    pub unit: Option<String>,
}

impl Quantity {
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: Some(unit.into()),
        }
    }

    /// Lift a wire quantity, failing when the value is absent.
    pub fn from_wire(wire: &cuff_fhir::Quantity) -> CoreResult<Self> {
        let value = wire
            .value
            .ok_or_else(|| CoreError::MalformedRecord("quantity without a value".to_string()))?;
        Ok(Self {
            value,
            unit: wire.unit.clone(),
        })
    }
}

impl std::fmt::Display for Quantity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.unit {
            Some(unit) => write!(f, "{} {}", self.value, unit),
            None => write!(f, "{}", self.value),
        }
    }
}
