//! Observation classification.
//!
//! Classification is a pure partition: each observation lands in exactly one
//! bucket. An observation may carry several recognised codings; the first
//! match in [`CLASSIFICATION_PRIORITY`] wins, so the order is an explicit
//! constant rather than an artefact of scan order.

use crate::config::CodingConfig;
use cuff_fhir::Observation;

/// The bucket an observation falls into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObservationClass {
    /// Self-contained blood-pressure panel (components carry both halves).
    BpPanel,
    /// Single systolic component reading.
    Systolic,
    /// Single diastolic component reading.
    Diastolic,
    /// Protocol-adherence question.
    Protocol,
    /// None of the recognised code sets matched.
    Unrecognized,
}

/// The order in which code sets are consulted. Panel outranks the component
/// codes so a panel observation that also carries component codings is never
/// mis-bucketed as a single component.
pub const CLASSIFICATION_PRIORITY: [ObservationClass; 4] = [
    ObservationClass::BpPanel,
    ObservationClass::Systolic,
    ObservationClass::Diastolic,
    ObservationClass::Protocol,
];

/// Classify one observation against the configured code sets.
pub fn classify(observation: &Observation, config: &CodingConfig) -> ObservationClass {
    for class in CLASSIFICATION_PRIORITY {
        let candidates = match class {
            ObservationClass::BpPanel => &config.bp_panel,
            ObservationClass::Systolic => &config.systolic,
            ObservationClass::Diastolic => &config.diastolic,
            ObservationClass::Protocol => &config.protocol,
            ObservationClass::Unrecognized => unreachable!(),
        };
        if observation.has_coding(candidates) {
            return class;
        }
    }
    ObservationClass::Unrecognized
}

/// Whether the class marks a blood-pressure observation of any shape.
pub fn is_bp_class(class: ObservationClass) -> bool {
    matches!(
        class,
        ObservationClass::BpPanel | ObservationClass::Systolic | ObservationClass::Diastolic
    )
}
