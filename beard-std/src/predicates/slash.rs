//! Slash command predicate.

use beard_core::{AsyncPredicate, ChatMessage, PredicateContext};
use regex::Regex;
use std::sync::{Arc, Mutex, PoisonError};

/// Matches `/name`, optionally addressed to this bot as `/name@username`.
///
/// The command must be followed by end of text, whitespace, or
/// `@<this bot's username>` (itself followed by end of text or whitespace).
/// `/name@otherbot` is rejected, as is any longer command sharing the prefix.
/// Matching is case sensitive.
///
/// The bot username is looked up through the instance's
/// [`BotIdentity`](beard_core::BotIdentity), which only suspends on first use.
pub struct SlashCommand {
    name: String,
    compiled: Mutex<Option<Arc<Compiled>>>,
}

struct Compiled {
    username: String,
    regex: Regex,
}

impl SlashCommand {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            compiled: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Builds the anchored pattern for `username`.
    pub fn pattern(&self, username: &str) -> String {
        format!(
            r"\A/{}(?:@{}(?:\s|\z)|\s|\z)",
            regex::escape(&self.name),
            regex::escape(username)
        )
    }

    fn compiled_for(&self, username: &str) -> Option<Arc<Compiled>> {
        let mut slot = self.compiled.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(compiled) = slot.as_ref().filter(|c| c.username == username) {
            return Some(compiled.clone());
        }
        // Both parts are escaped; only the size limit can reject this.
        let regex = match Regex::new(&self.pattern(username)) {
            Ok(regex) => regex,
            Err(err) => {
                tracing::warn!(command = %self.name, error = %err, "slash command pattern rejected");
                return None;
            }
        };
        let compiled = Arc::new(Compiled {
            username: username.to_owned(),
            regex,
        });
        *slot = Some(compiled.clone());
        Some(compiled)
    }

    /// Matches `text` for a known bot username.
    pub fn matches(&self, username: &str, text: &str) -> bool {
        self.compiled_for(username)
            .is_some_and(|compiled| compiled.regex.is_match(text))
    }
}

impl AsyncPredicate for SlashCommand {
    async fn check(&self, ctx: &PredicateContext<'_>, msg: &ChatMessage) -> bool {
        let Some(text) = msg.text() else {
            return false;
        };
        // Cheap rejection before touching the identity.
        if !text.starts_with('/') {
            return false;
        }
        let username = match ctx.identity.username().await {
            Ok(username) => username,
            Err(err) => {
                tracing::warn!(command = %self.name, error = %err, "cannot resolve bot username");
                return false;
            }
        };
        let matched = self.matches(username, text);
        tracing::debug!(command = %self.name, text, matched, "matched slash command");
        matched
    }
}

impl std::fmt::Debug for SlashCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlashCommand")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
