//! Standard predicate implementations.

pub mod filters;
pub mod pattern;
pub mod slash;

pub use filters::Filters;
pub use pattern::{RegexPredicate, regex};
pub use slash::SlashCommand;

use beard_core::Predicate;

/// An awaitable predicate matching `/name` addressed to this bot.
pub fn slash_command(name: impl Into<String>) -> Predicate {
    Predicate::from_async(SlashCommand::new(name))
}
