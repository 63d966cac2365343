//! Encounter/observation correlation pass.

use crate::config::CodingConfig;
use crate::model::BloodPressureReading;
use crate::transform::classifier::{classify, is_bp_class, ObservationClass};
use crate::transform::encounter_index::{EncounterIndex, Slot};
use crate::transform::orphans;
use cuff_fhir::{Bundle, Observation};
use std::collections::HashMap;

/// Correlate a fetched bundle into unified blood-pressure readings.
///
/// `known_encounters` holds the session's previously cached visits; any
/// encounters carried by the bundle itself are added on top, so newly created
/// visits correlate on the same pass that introduced them.
///
/// Guarantees:
/// - an observation is attributed to at most one reading, across every key
///   alias of its encounter (buckets are keyed by arena slot and removed as
///   they are consumed);
/// - an encounter with N qualifying observations yields N readings, all
///   sharing the encounter's single protocol-adherence answer if one exists;
/// - per-record failures are logged and skipped, never escalated.
pub fn correlate_blood_pressures(
    bundle: &Bundle,
    known_encounters: &EncounterIndex,
    config: &CodingConfig,
) -> Vec<BloodPressureReading> {
    let mut index = known_encounters.clone();
    for encounter in bundle.encounters() {
        index.insert(encounter);
    }

    // Group observations under their resolved visit. `None` is the reserved
    // no-encounter bucket: both observations without a reference and
    // observations whose reference matches no known visit land there.
    let mut by_slot: HashMap<Option<Slot>, Vec<&Observation>> = HashMap::new();
    for observation in bundle.observations() {
        let slot = observation
            .encounter
            .as_ref()
            .and_then(|reference| index.resolve_slot(reference));
        if slot.is_none() && observation.encounter.is_some() {
            tracing::debug!(
                observation = observation.display_id(),
                "encounter reference did not resolve, treating as orphan"
            );
        }
        by_slot.entry(slot).or_default().push(observation);
    }

    let mut readings = Vec::new();
    for slot in 0..index.len() {
        // Remove the bucket as it is consumed so no alias can reprocess it.
        let Some(observations) = by_slot.remove(&Some(slot)) else {
            continue;
        };
        let encounter = index.get(slot);
        tracing::debug!(
            encounter = encounter.display_id(),
            count = observations.len(),
            "building observations for encounter"
        );

        let mut bp_observations = Vec::new();
        let mut protocol: Option<&Observation> = None;
        for observation in observations {
            let class = classify(observation, config);
            if is_bp_class(class) {
                bp_observations.push(observation);
            } else if class == ObservationClass::Protocol && protocol.is_none() {
                // First protocol observation wins; any further ones are
                // ignored, not an error.
                protocol = Some(observation);
            }
        }

        for observation in bp_observations {
            match BloodPressureReading::from_encounter_observation(
                encounter,
                observation,
                protocol,
                config,
            ) {
                Ok(reading) => readings.push(reading),
                Err(err) => tracing::debug!(
                    observation = observation.display_id(),
                    encounter = encounter.display_id(),
                    %err,
                    "skipping observation"
                ),
            }
        }
    }

    let orphaned = by_slot.remove(&None).unwrap_or_default();
    readings.extend(orphans::pair_orphans(orphaned, config));

    readings
}
