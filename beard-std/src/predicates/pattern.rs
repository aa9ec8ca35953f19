//! Free-form regex predicate.

use beard_core::{ChatMessage, Predicate};
use regex::Regex;

/// Matches messages whose text matches a pattern anchored at the start.
///
/// Only the start is anchored: `"hel"` matches `"hello"`. Messages without
/// text never match.
#[derive(Debug, Clone)]
pub struct RegexPredicate {
    regex: Regex,
}

impl RegexPredicate {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(&format!(r"\A(?:{pattern})"))?,
        })
    }

    pub fn is_match(&self, msg: &ChatMessage) -> bool {
        let matched = msg.text().is_some_and(|text| self.regex.is_match(text));
        tracing::debug!(pattern = %self.regex, matched, "matched regex");
        matched
    }

    /// The capture groups of a match, for handlers that want them.
    pub fn captures<'t>(&self, text: &'t str) -> Option<regex::Captures<'t>> {
        self.regex.captures(text)
    }

    pub fn into_predicate(self) -> Predicate {
        Predicate::sync(move |_, msg| self.is_match(msg))
    }
}

/// A synchronous predicate matching `pattern` at the start of the text.
pub fn regex(pattern: &str) -> Result<Predicate, regex::Error> {
    Ok(RegexPredicate::new(pattern)?.into_predicate())
}
