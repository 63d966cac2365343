//! Recommendation cards and their actionable suggestions.
//!
//! Cards are produced by an external recommendation service per hook id and
//! cached alongside the derived clinical collections. Suggestions are the one
//! piece of cached data that mutates after caching: acting on a suggestion
//! removes it. Removal is expressed here as a pure operation
//! ([`Card::without_suggestion`]) so the cache can swap whole values instead
//! of mutating shared state.

use serde::{Deserialize, Serialize};

/// Suggestion kind marking a goal proposal, used when filtering suggestions
/// the user has already responded to.
pub const SUGGESTION_KIND_GOAL: &str = "goal";

/// A recommendation hook exposed by the external service.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct CdsHook {
    pub id: String,
    #[serde(default)]
    pub hook: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Attribution for a card.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CardSource {
    pub label: Option<String>,
    pub url: Option<String>,
}

/// An actionable sub-item of a card.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Suggestion {
    /// Suggestions without an id cannot be addressed by removal and are
    /// always left in place.
    pub id: Option<String>,
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub actions: Vec<String>,
}

/// An external link attached to a card.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Link {
    pub label: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// One recommendation card.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Card {
    pub summary: Option<String>,
    pub indicator: Option<String>,
    pub detail: Option<String>,
    pub rationale: Option<String>,
    pub source: Option<CardSource>,
    pub selection_behavior: Option<String>,
    pub suggestions: Vec<Suggestion>,
    pub links: Vec<Link>,
}

impl Card {
    /// Whether any suggestion carries exactly this id.
    pub fn has_suggestion(&self, id: &str) -> bool {
        self.suggestions
            .iter()
            .any(|s| s.id.as_deref() == Some(id))
    }

    /// A copy of this card with every suggestion carrying `id` removed.
    pub fn without_suggestion(&self, id: &str) -> Card {
        let mut card = self.clone();
        card.suggestions.retain(|s| s.id.as_deref() != Some(id));
        card
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suggestion(id: Option<&str>) -> Suggestion {
        Suggestion {
            id: id.map(str::to_string),
            label: Some("do the thing".into()),
            ..Suggestion::default()
        }
    }

    #[test]
    fn without_suggestion_removes_only_matching_ids() {
        let card = Card {
            suggestions: vec![suggestion(Some("s-1")), suggestion(Some("s-2")), suggestion(None)],
            ..Card::default()
        };
        let trimmed = card.without_suggestion("s-1");
        assert_eq!(trimmed.suggestions.len(), 2);
        assert!(!trimmed.has_suggestion("s-1"));
        assert!(trimmed.has_suggestion("s-2"));
        // the original is untouched
        assert!(card.has_suggestion("s-1"));
    }

    #[test]
    fn idless_suggestions_are_never_addressable() {
        let card = Card {
            suggestions: vec![suggestion(None)],
            ..Card::default()
        };
        assert!(!card.has_suggestion(""));
        assert_eq!(card.without_suggestion("").suggestions.len(), 1);
    }
}
