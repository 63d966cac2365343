//! Pairing of observations that belong to no visit.
//!
//! Without an encounter to anchor pairing, exact timestamp equality is the
//! only reliable correlation signal. Panel observations are self-contained
//! and become readings directly; single systolic/diastolic observations are
//! grouped by their exact upstream timestamp string (no rounding, no
//! normalisation) and only a clean 1+1 pair produces a reading. Anything
//! ambiguous is rejected and logged, never guessed at.

use crate::config::CodingConfig;
use crate::model::BloodPressureReading;
use crate::transform::classifier::{classify, ObservationClass};
use cuff_fhir::Observation;
use std::collections::HashMap;

/// Process the reserved no-encounter bucket.
pub(crate) fn pair_orphans(
    orphans: Vec<&Observation>,
    config: &CodingConfig,
) -> Vec<BloodPressureReading> {
    let mut readings = Vec::new();

    // Timestamp groups in first-seen order, for deterministic output.
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<&Observation>> = HashMap::new();

    for observation in orphans {
        match classify(observation, config) {
            ObservationClass::BpPanel => {
                match BloodPressureReading::from_panel_observation(observation, config) {
                    Ok(reading) => {
                        tracing::debug!(
                            observation = observation.display_id(),
                            "panel observation without encounter became its own reading"
                        );
                        readings.push(reading);
                    }
                    Err(err) => tracing::debug!(
                        observation = observation.display_id(),
                        %err,
                        "skipping observation"
                    ),
                }
            }
            ObservationClass::Systolic | ObservationClass::Diastolic => {
                let Some(raw) = observation.effective_raw() else {
                    tracing::warn!(
                        observation = observation.display_id(),
                        "component observation without timestamp cannot be paired, skipping"
                    );
                    continue;
                };
                if !groups.contains_key(raw) {
                    order.push(raw.to_string());
                }
                groups.entry(raw.to_string()).or_default().push(observation);
            }
            ObservationClass::Protocol => tracing::debug!(
                observation = observation.display_id(),
                "protocol observation without encounter, ignored"
            ),
            ObservationClass::Unrecognized => tracing::debug!(
                observation = observation.display_id(),
                "did not process observation"
            ),
        }
    }

    for timestamp in order {
        let group = groups.remove(&timestamp).unwrap_or_default();
        if group.len() != 2 {
            tracing::warn!(
                %timestamp,
                count = group.len(),
                "expected 2 component observations for timestamp, skipping"
            );
            continue;
        }

        let (first, second) = (group[0], group[1]);
        let pair = match (classify(first, config), classify(second, config)) {
            (ObservationClass::Systolic, ObservationClass::Diastolic) => Some((first, second)),
            (ObservationClass::Diastolic, ObservationClass::Systolic) => Some((second, first)),
            _ => None,
        };
        let Some((systolic, diastolic)) = pair else {
            tracing::warn!(
                first = first.display_id(),
                second = second.display_id(),
                "unexpected observation pair for timestamp, skipping"
            );
            continue;
        };

        match BloodPressureReading::from_component_pair(systolic, diastolic, config) {
            Ok(reading) => readings.push(reading),
            Err(err) => tracing::debug!(
                systolic = systolic.display_id(),
                diastolic = diastolic.display_id(),
                %err,
                "skipping observation pair"
            ),
        }
    }

    readings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReadingSource;
    use cuff_fhir::{CodeableConcept, Coding, Quantity};

    fn single(id: &str, code: &str, value: f64, timestamp: &str) -> Observation {
        Observation {
            id: Some(id.into()),
            code: Some(CodeableConcept {
                coding: vec![Coding::new("http://loinc.org", code)],
                text: None,
            }),
            effective_date_time: Some(timestamp.into()),
            value_quantity: Some(Quantity {
                value: Some(value),
                unit: Some("mmHg".into()),
                ..Quantity::default()
            }),
            ..Observation::default()
        }
    }

    fn systolic(id: &str, value: f64, timestamp: &str) -> Observation {
        single(id, "8480-6", value, timestamp)
    }

    fn diastolic(id: &str, value: f64, timestamp: &str) -> Observation {
        single(id, "8462-4", value, timestamp)
    }

    #[test]
    fn matching_timestamps_pair_into_one_reading() {
        let config = CodingConfig::default();
        let s = systolic("o-s", 130.0, "2024-05-03T08:00:00Z");
        let d = diastolic("o-d", 85.0, "2024-05-03T08:00:00Z");
        let readings = pair_orphans(vec![&s, &d], &config);
        assert_eq!(readings.len(), 1);
        let reading = &readings[0];
        assert_eq!(reading.systolic.value, 130.0);
        assert_eq!(reading.diastolic.value, 85.0);
        assert!(reading.encounter_id.is_none());
        assert_eq!(reading.source, ReadingSource::ComponentPair);
    }

    #[test]
    fn pairing_is_order_independent() {
        let config = CodingConfig::default();
        let s = systolic("o-s", 130.0, "2024-05-03T08:00:00Z");
        let d = diastolic("o-d", 85.0, "2024-05-03T08:00:00Z");
        let forward = pair_orphans(vec![&s, &d], &config);
        let backward = pair_orphans(vec![&d, &s], &config);
        assert_eq!(forward, backward);
    }

    #[test]
    fn group_of_three_is_rejected() {
        let config = CodingConfig::default();
        let s1 = systolic("o-s1", 130.0, "2024-05-03T08:00:00Z");
        let s2 = systolic("o-s2", 132.0, "2024-05-03T08:00:00Z");
        let d = diastolic("o-d", 85.0, "2024-05-03T08:00:00Z");
        assert!(pair_orphans(vec![&s1, &s2, &d], &config).is_empty());
    }

    #[test]
    fn same_typed_pair_is_rejected() {
        let config = CodingConfig::default();
        let s1 = systolic("o-s1", 130.0, "2024-05-03T08:00:00Z");
        let s2 = systolic("o-s2", 132.0, "2024-05-03T08:00:00Z");
        assert!(pair_orphans(vec![&s1, &s2], &config).is_empty());
    }

    #[test]
    fn lone_component_is_rejected() {
        let config = CodingConfig::default();
        let s = systolic("o-s", 130.0, "2024-05-03T08:00:00Z");
        assert!(pair_orphans(vec![&s], &config).is_empty());
    }

    #[test]
    fn timestamps_differing_only_in_offset_do_not_pair() {
        // Identical instants written differently are *not* the same string;
        // without an encounter anchor there is no basis to merge them.
        let config = CodingConfig::default();
        let s = systolic("o-s", 130.0, "2024-05-03T08:00:00Z");
        let d = diastolic("o-d", 85.0, "2024-05-03T09:00:00+01:00");
        assert!(pair_orphans(vec![&s, &d], &config).is_empty());
    }

    #[test]
    fn distinct_timestamp_groups_pair_independently() {
        let config = CodingConfig::default();
        let s1 = systolic("o-s1", 130.0, "2024-05-03T08:00:00Z");
        let d1 = diastolic("o-d1", 85.0, "2024-05-03T08:00:00Z");
        let s2 = systolic("o-s2", 140.0, "2024-05-04T08:00:00Z");
        let d2 = diastolic("o-d2", 90.0, "2024-05-04T08:00:00Z");
        let readings = pair_orphans(vec![&s1, &s2, &d2, &d1], &config);
        assert_eq!(readings.len(), 2);
        // first-seen timestamp order is preserved
        assert_eq!(readings[0].systolic.value, 130.0);
        assert_eq!(readings[1].systolic.value, 140.0);
    }

    #[test]
    fn component_without_timestamp_is_skipped() {
        let config = CodingConfig::default();
        let mut s = systolic("o-s", 130.0, "2024-05-03T08:00:00Z");
        s.effective_date_time = None;
        let d = diastolic("o-d", 85.0, "2024-05-03T08:00:00Z");
        assert!(pair_orphans(vec![&s, &d], &config).is_empty());
    }
}
