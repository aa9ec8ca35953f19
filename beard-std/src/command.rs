//! The command model: a trigger bound to a handler.

use crate::predicates::slash_command;
use beard_core::{Handler, Predicate};
use std::borrow::Cow;

/// What makes a command fire.
///
/// A string names a slash command; anything else is an explicit predicate.
#[derive(Clone, Debug)]
pub enum Trigger {
    Slash(String),
    Predicate(Predicate),
}

impl From<&str> for Trigger {
    fn from(name: &str) -> Self {
        Trigger::Slash(name.to_owned())
    }
}

impl From<String> for Trigger {
    fn from(name: String) -> Self {
        Trigger::Slash(name)
    }
}

impl From<Predicate> for Trigger {
    fn from(predicate: Predicate) -> Self {
        Trigger::Predicate(predicate)
    }
}

/// An immutable binding of a predicate to a handler, with optional help.
#[derive(Clone, Debug)]
pub struct Command {
    predicate: Predicate,
    handler: Handler,
    help: Option<Cow<'static, str>>,
    slash: Option<String>,
}

impl Command {
    /// Builds a command from a slash command name or a predicate.
    pub fn new(trigger: impl Into<Trigger>, handler: impl Into<Handler>) -> Self {
        match trigger.into() {
            Trigger::Slash(name) => Self {
                predicate: slash_command(name.clone()),
                handler: handler.into(),
                help: None,
                slash: Some(name),
            },
            Trigger::Predicate(predicate) => Self {
                predicate,
                handler: handler.into(),
                help: None,
                slash: None,
            },
        }
    }

    /// Shorthand for a slash command.
    pub fn slash(name: impl Into<String>, handler: impl Into<Handler>) -> Self {
        Self::new(Trigger::Slash(name.into()), handler)
    }

    pub fn with_help(mut self, help: impl Into<Cow<'static, str>>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub fn help(&self) -> Option<&str> {
        self.help.as_deref()
    }

    /// The slash command name, when the command was built from one.
    pub fn slash_name(&self) -> Option<&str> {
        self.slash.as_deref()
    }

    /// A short label for listings and logs.
    pub fn label(&self) -> Cow<'_, str> {
        match (&self.slash, self.handler.method_name()) {
            (Some(name), _) => Cow::Owned(format!("/{name}")),
            (None, Some(method)) => Cow::Borrowed(method),
            (None, None) => Cow::Borrowed("<filter>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicates::Filters;

    #[test]
    fn string_trigger_becomes_async_slash_command() {
        let cmd = Command::new("whoami", "who_am_i").with_help("Returns the chat id.");
        assert!(cmd.predicate().is_async());
        assert_eq!(cmd.slash_name(), Some("whoami"));
        assert_eq!(cmd.help(), Some("Returns the chat id."));
        assert_eq!(cmd.label(), "/whoami");
        assert_eq!(cmd.handler().method_name(), Some("who_am_i"));
    }

    #[test]
    fn predicate_trigger_keeps_predicate() {
        let cmd = Command::new(Filters::location(), "on_location");
        assert!(!cmd.predicate().is_async());
        assert!(cmd.slash_name().is_none());
        assert!(cmd.help().is_none());
        assert_eq!(cmd.label(), "on_location");

        let cmd = Command::new(Filters::text(), Handler::sync(|_, _| Ok(())));
        assert_eq!(cmd.label(), "<filter>");
    }
}
