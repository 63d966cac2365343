//! Identity-key construction for encounter matching.
//!
//! An encounter can be referenced three ways in upstream data: by relative
//! reference (`Encounter/<id>`), by absolute URL ending in the same segment,
//! or by business identifier. Correlation therefore derives a *set* of keys
//! from each side (encounter record and observation reference), and a match
//! on any single key is a match.
//!
//! Key forms:
//! - `Encounter/<id>` and the bare `<id>` for the logical id
//! - `<system>|<value>` (or bare `<value>`) for each business identifier

use crate::types::{Identifier, Reference};

/// Build the identity keys for an encounter record from its logical id and
/// business identifiers. An encounter with neither yields no keys and is
/// unreachable by correlation.
pub fn encounter_keys(id: Option<&str>, identifiers: &[Identifier]) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(raw) = id {
        push_id_keys(&mut keys, raw);
    }
    for identifier in identifiers {
        if let Some(key) = identifier_key(identifier) {
            push_unique(&mut keys, key);
        }
    }
    keys
}

/// Build the candidate keys for a reference as found on an observation.
pub fn reference_keys(reference: &Reference) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(raw) = reference.reference.as_deref() {
        push_id_keys(&mut keys, raw);
    }
    if let Some(identifier) = &reference.identifier {
        if let Some(key) = identifier_key(identifier) {
            push_unique(&mut keys, key);
        }
    }
    keys
}

/// The `system|value` key for a business identifier, or bare `value` when no
/// system is given. Identifiers without a value produce no key.
pub fn identifier_key(identifier: &Identifier) -> Option<String> {
    let value = identifier.value.as_deref()?;
    if value.is_empty() {
        return None;
    }
    Some(match identifier.system.as_deref() {
        Some(system) if !system.is_empty() => format!("{system}|{value}"),
        _ => value.to_string(),
    })
}

/// Normalise a logical id or reference string into its two key forms.
///
/// Handles `Encounter/123`, absolute URLs ending in `Encounter/123`, ids
/// carrying a `/_history/<n>` suffix, and bare ids.
fn push_id_keys(keys: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return;
    }

    // Strip any version suffix first.
    let without_history = match trimmed.find("/_history/") {
        Some(pos) => &trimmed[..pos],
        None => trimmed,
    };

    let bare = match without_history.rfind("Encounter/") {
        Some(pos) => &without_history[pos + "Encounter/".len()..],
        None => without_history,
    };
    if bare.is_empty() {
        return;
    }

    push_unique(keys, format!("Encounter/{bare}"));
    push_unique(keys, bare.to_string());
}

fn push_unique(keys: &mut Vec<String>, key: String) {
    if !keys.contains(&key) {
        keys.push(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identifier(system: Option<&str>, value: Option<&str>) -> Identifier {
        Identifier {
            system: system.map(str::to_string),
            value: value.map(str::to_string),
        }
    }

    #[test]
    fn encounter_keys_cover_id_and_identifiers() {
        let keys = encounter_keys(
            Some("e-100"),
            &[identifier(Some("urn:visit"), Some("V-7"))],
        );
        assert_eq!(keys, vec!["Encounter/e-100", "e-100", "urn:visit|V-7"]);
    }

    #[test]
    fn absolute_url_reduces_to_relative_and_bare() {
        let mut keys = Vec::new();
        push_id_keys(&mut keys, "https://ehr.example.org/fhir/Encounter/e-100");
        assert_eq!(keys, vec!["Encounter/e-100", "e-100"]);
    }

    #[test]
    fn history_suffix_is_stripped() {
        let mut keys = Vec::new();
        push_id_keys(&mut keys, "Encounter/e-100/_history/3");
        assert_eq!(keys, vec!["Encounter/e-100", "e-100"]);
    }

    #[test]
    fn reference_keys_include_identifier_key() {
        let reference = Reference {
            reference: Some("Encounter/e-100".into()),
            identifier: Some(identifier(Some("urn:visit"), Some("V-7"))),
            display: None,
        };
        assert_eq!(
            reference_keys(&reference),
            vec!["Encounter/e-100", "e-100", "urn:visit|V-7"]
        );
    }

    #[test]
    fn keys_overlap_between_reference_and_encounter_forms() {
        // A bare-id reference must still meet a full-id encounter.
        let reference = Reference {
            reference: Some("e-100".into()),
            identifier: None,
            display: None,
        };
        let enc = encounter_keys(Some("e-100"), &[]);
        let refs = reference_keys(&reference);
        assert!(refs.iter().any(|k| enc.contains(k)));
    }

    #[test]
    fn empty_inputs_yield_no_keys() {
        assert!(encounter_keys(None, &[]).is_empty());
        assert!(encounter_keys(Some("  "), &[identifier(Some("urn:x"), None)]).is_empty());
        assert!(identifier_key(&identifier(None, Some(""))).is_none());
    }

    #[test]
    fn identifier_without_system_uses_bare_value() {
        assert_eq!(
            identifier_key(&identifier(None, Some("V-7"))).as_deref(),
            Some("V-7")
        );
    }
}
