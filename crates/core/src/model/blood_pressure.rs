//! Unified blood-pressure reading.
//!
//! A reading is valid only when systolic, diastolic and timestamp are all
//! present; the constructors fail rather than default any of them. Three
//! construction paths exist, one per correlation outcome:
//!
//! - an observation found inside an encounter (components carry both halves)
//! - a self-contained panel observation without an encounter
//! - two timestamp-paired orphan component observations

use crate::config::CodingConfig;
use crate::model::quantity::Quantity;
use crate::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use cuff_fhir::{Encounter, Observation};
use serde::{Deserialize, Serialize};

/// How a reading was correlated.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReadingSource {
    /// Built from an observation attributed to a visit.
    Encounter,
    /// Built from a self-contained panel observation with no visit.
    Panel,
    /// Built from a timestamp-matched systolic/diastolic orphan pair.
    ComponentPair,
}

/// A unified systolic+diastolic data point.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct BloodPressureReading {
    pub systolic: Quantity,
    pub diastolic: Quantity,
    pub timestamp: DateTime<Utc>,
    /// Logical id of the owning visit, when one was resolved.
    pub encounter_id: Option<String>,
    /// Whether the home-monitoring protocol was followed, when answered.
    pub followed_protocol: Option<bool>,
    pub source: ReadingSource,
}

impl BloodPressureReading {
    /// Build a reading from an observation attributed to `encounter`.
    ///
    /// Both components must be present on the observation itself; `protocol`
    /// is the encounter's (at most one) protocol-adherence observation, whose
    /// answer is shared by every reading of that encounter.
    pub fn from_encounter_observation(
        encounter: &Encounter,
        observation: &Observation,
        protocol: Option<&Observation>,
        config: &CodingConfig,
    ) -> CoreResult<Self> {
        let (systolic, diastolic) = both_components(observation, config)?;
        Ok(Self {
            systolic,
            diastolic,
            timestamp: required_timestamp(observation)?,
            encounter_id: encounter.id.clone(),
            followed_protocol: protocol.and_then(|obs| protocol_answer(obs, config)),
            source: ReadingSource::Encounter,
        })
    }

    /// Build a reading from a self-contained panel observation.
    pub fn from_panel_observation(
        observation: &Observation,
        config: &CodingConfig,
    ) -> CoreResult<Self> {
        let (systolic, diastolic) = both_components(observation, config)?;
        Ok(Self {
            systolic,
            diastolic,
            timestamp: required_timestamp(observation)?,
            encounter_id: None,
            followed_protocol: None,
            source: ReadingSource::Panel,
        })
    }

    /// Build a reading from a timestamp-matched orphan pair. The caller has
    /// already established that the two observations share an exact
    /// effective-timestamp string and carry one systolic and one diastolic
    /// coding.
    pub fn from_component_pair(
        systolic_observation: &Observation,
        diastolic_observation: &Observation,
        _config: &CodingConfig,
    ) -> CoreResult<Self> {
        let systolic = own_quantity(systolic_observation)?;
        let diastolic = own_quantity(diastolic_observation)?;
        Ok(Self {
            systolic,
            diastolic,
            timestamp: required_timestamp(systolic_observation)?,
            encounter_id: None,
            followed_protocol: None,
            source: ReadingSource::ComponentPair,
        })
    }
}

/// Pull the systolic and diastolic component quantities off one observation.
fn both_components(
    observation: &Observation,
    config: &CodingConfig,
) -> CoreResult<(Quantity, Quantity)> {
    let systolic = observation
        .component_quantity(&config.systolic)
        .ok_or_else(|| missing(observation, "systolic component"))?;
    let diastolic = observation
        .component_quantity(&config.diastolic)
        .ok_or_else(|| missing(observation, "diastolic component"))?;
    Ok((Quantity::from_wire(systolic)?, Quantity::from_wire(diastolic)?))
}

/// The observation's own value quantity (single-component orphan form).
fn own_quantity(observation: &Observation) -> CoreResult<Quantity> {
    let quantity = observation
        .value_quantity
        .as_ref()
        .ok_or_else(|| missing(observation, "value quantity"))?;
    Quantity::from_wire(quantity)
}

fn required_timestamp(observation: &Observation) -> CoreResult<DateTime<Utc>> {
    observation
        .effective_instant_utc()
        .ok_or_else(|| missing(observation, "effective timestamp"))
}

fn missing(observation: &Observation, what: &str) -> CoreError {
    CoreError::MalformedRecord(format!(
        "observation {} is missing {what}",
        observation.display_id()
    ))
}

/// Interpret an encounter's protocol-adherence observation.
///
/// The answer value is matched against the configured yes/no strings, first
/// on the concept text and then on the concept label. Unknown answers are
/// logged and treated as unanswered.
pub(crate) fn protocol_answer(observation: &Observation, config: &CodingConfig) -> Option<bool> {
    let concept = observation.value_codeable_concept.as_ref()?;
    let answer = concept.text.as_deref().or_else(|| concept.label())?;
    if answer == config.protocol_answer_yes {
        Some(true)
    } else if answer == config.protocol_answer_no {
        Some(false)
    } else {
        tracing::debug!(
            observation = observation.display_id(),
            answer,
            "unrecognised protocol-adherence answer"
        );
        None
    }
}
