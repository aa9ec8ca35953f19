//! Message shape filters.

use beard_core::{ContentKind, Predicate};

/// Predicates that match on what a message carries rather than what it says.
pub struct Filters;

impl Filters {
    /// Text messages.
    pub fn text() -> Predicate {
        Self::any_of(ContentKind::TEXT)
    }

    /// Sent documents.
    pub fn document() -> Predicate {
        Self::any_of(ContentKind::DOCUMENT)
    }

    /// Sent locations.
    pub fn location() -> Predicate {
        Self::any_of(ContentKind::LOCATION)
    }

    /// Messages carrying at least one of `kinds`.
    pub fn any_of(kinds: ContentKind) -> Predicate {
        Predicate::sync(move |_, msg| msg.content().intersects(kinds))
    }

    /// Messages carrying every one of `kinds`.
    pub fn all_of(kinds: ContentKind) -> Predicate {
        Predicate::sync(move |_, msg| msg.content().contains(kinds))
    }
}
