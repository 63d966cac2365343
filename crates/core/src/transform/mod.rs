//! Observation correlation engine.
//!
//! Turns a loosely structured bundle of clinical resources into unified
//! blood-pressure readings:
//!
//! 1. [`EncounterIndex`] maps every identity key of every known visit to a
//!    single arena slot, so aliased keys resolve to one record.
//! 2. [`classify`] partitions observations into panel / systolic / diastolic
//!    / protocol / unrecognised buckets in a fixed priority order.
//! 3. The correlator groups bundle observations under their resolved visit
//!    and builds one reading per blood-pressure observation found there.
//! 4. Observations with no resolvable visit fall to the orphan pairer, which
//!    matches systolic/diastolic singles by exact timestamp.
//!
//! Per-record failures are logged and skipped inside this pass; nothing here
//! aborts a whole correlation run.

mod classifier;
mod correlator;
mod encounter_index;
mod orphans;

pub use classifier::{classify, ObservationClass, CLASSIFICATION_PRIORITY};
pub use correlator::correlate_blood_pressures;
pub use encounter_index::EncounterIndex;
