//! Multi-key encounter lookup.
//!
//! Every identity key of an encounter, logical-id forms and business
//! identifiers alike, must resolve to the *same* record. Rather than alias
//! shared structures under multiple map keys, the index stores each encounter
//! once in an arena and maps every key to its slot, so deduplication rests on
//! slot identity instead of pointer identity.

use cuff_fhir::{keys, Encounter, Reference};
use std::collections::HashMap;

/// Arena slot position; stable for the life of the index.
pub type Slot = usize;

/// Arena of encounters plus a key-to-slot map over every identity key.
#[derive(Clone, Debug, Default)]
pub struct EncounterIndex {
    slots: Vec<Encounter>,
    by_key: HashMap<String, Slot>,
}

impl EncounterIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from a collection of encounters.
    pub fn from_encounters<'a>(encounters: impl IntoIterator<Item = &'a Encounter>) -> Self {
        let mut index = Self::new();
        for encounter in encounters {
            index.insert(encounter);
        }
        index
    }

    /// Insert an encounter, returning its slot.
    ///
    /// If any of the encounter's keys is already mapped, the remaining keys
    /// are aliased onto the existing slot and the record is not stored again.
    /// An encounter with zero keys is unreachable by lookup and is not
    /// stored; it cannot be referenced by any observation either.
    pub fn insert(&mut self, encounter: &Encounter) -> Option<Slot> {
        let keys = encounter.keys();
        if keys.is_empty() {
            tracing::debug!(
                encounter = encounter.display_id(),
                "encounter has no identity keys, excluded from correlation"
            );
            return None;
        }

        let existing = keys.iter().find_map(|key| self.by_key.get(key).copied());
        let slot = match existing {
            Some(slot) => slot,
            None => {
                self.slots.push(encounter.clone());
                self.slots.len() - 1
            }
        };
        for key in keys {
            self.by_key.entry(key).or_insert(slot);
        }
        Some(slot)
    }

    /// Resolve a reference to a slot: the first candidate key that matches
    /// wins. An unmatched reference is not an error.
    pub fn resolve_slot(&self, reference: &Reference) -> Option<Slot> {
        keys::reference_keys(reference)
            .iter()
            .find_map(|key| self.by_key.get(key).copied())
    }

    /// Resolve a reference to its encounter record.
    pub fn resolve(&self, reference: &Reference) -> Option<&Encounter> {
        self.resolve_slot(reference).map(|slot| &self.slots[slot])
    }

    /// The encounter stored in `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot` did not come from this index.
    pub fn get(&self, slot: Slot) -> &Encounter {
        &self.slots[slot]
    }

    /// Number of distinct encounters (not keys).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterate distinct encounters in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Encounter> {
        self.slots.iter()
    }
}
