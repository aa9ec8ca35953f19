//! Registry module for beard management.
//!
//! Beards are registered explicitly with [`Registry::register`], or declared
//! anywhere in the program with [`register_beard!`](crate::register_beard)
//! and gathered by [`Registry::collect`].
//!
//! Names are unique. Base beards (`Beard::IS_BASE`) are skipped silently.

use crate::beard::{Beard, BeardDescriptor};
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;

/// Errors raised while building a registry.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("a beard named {0} is already registered")]
    AlreadyRegistered(String),

    #[error("invalid beard name {0:?}: names must be non-empty and must not contain ':'")]
    InvalidName(String),

    #[error("setup of beard {beard} failed")]
    Setup {
        beard: String,
        #[source]
        source: beard_core::BoxError,
    },
}

/// A beard declared with [`register_beard!`](crate::register_beard).
pub struct BeardRegistration {
    factory: fn() -> BeardDescriptor,
}

impl BeardRegistration {
    pub const fn new(factory: fn() -> BeardDescriptor) -> Self {
        Self { factory }
    }

    pub fn descriptor(&self) -> BeardDescriptor {
        (self.factory)()
    }
}

inventory::collect!(BeardRegistration);

/// Registers a beard type for [`Registry::collect`].
///
/// # Example
/// ```rust,ignore
/// struct Echo;
/// impl Beard for Echo { ... }
///
/// register_beard!(Echo);
/// ```
#[macro_export]
macro_rules! register_beard {
    ($beard:ty) => {
        $crate::inventory::submit! {
            $crate::registry::BeardRegistration::new(
                $crate::beard::BeardDescriptor::of::<$beard>
            )
        }
    };
}

/// Listed for beards that declare no [`Beard::USER_HELP`](crate::Beard::USER_HELP).
pub const DEFAULT_USER_HELP: &str =
    "The author has not defined a <code>USER_HELP</code> for this beard.";

/// One line of the beard listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpEntry {
    pub name: &'static str,
    /// The beard's help, or [`DEFAULT_USER_HELP`].
    pub user_help: &'static str,
    /// `(label, help)` for every declared command that has help.
    pub commands: Vec<(String, String)>,
}

/// The catalog of beards, in registration order.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    beards: Vec<Arc<BeardDescriptor>>,
    index: HashMap<&'static str, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from every [`register_beard!`](crate::register_beard)
    /// in the program, sorted by name.
    pub fn collect() -> Result<Self, RegistryError> {
        let mut descriptors: Vec<_> = inventory::iter::<BeardRegistration>
            .into_iter()
            .map(BeardRegistration::descriptor)
            .collect();
        descriptors.sort_by_key(|d| d.name());

        let mut registry = Self::new();
        for descriptor in descriptors {
            registry.register(descriptor)?;
        }
        Ok(registry)
    }

    /// Adds a beard.
    ///
    /// Returns `Ok(false)` when the descriptor is a base and was skipped.
    pub fn register(&mut self, descriptor: BeardDescriptor) -> Result<bool, RegistryError> {
        let name = descriptor.name();
        if descriptor.is_base() {
            tracing::trace!(beard = name, "skipping base beard");
            return Ok(false);
        }
        if name.is_empty() || name.contains(':') {
            return Err(RegistryError::InvalidName(name.to_owned()));
        }
        if self.index.contains_key(name) {
            return Err(RegistryError::AlreadyRegistered(name.to_owned()));
        }
        self.index.insert(name, self.beards.len());
        self.beards.push(Arc::new(descriptor));
        tracing::debug!(beard = name, "registered beard");
        Ok(true)
    }

    /// Shorthand for registering `B`'s descriptor.
    pub fn register_beard<B: Beard>(&mut self) -> Result<bool, RegistryError> {
        self.register(BeardDescriptor::of::<B>())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<BeardDescriptor>> {
        self.index.get(name).map(|&i| &self.beards[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<BeardDescriptor>> {
        self.beards.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.beards.iter().map(|d| d.name())
    }

    pub fn len(&self) -> usize {
        self.beards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beards.is_empty()
    }

    /// Name, help and helpful commands of every beard.
    pub fn help_entries(&self) -> Vec<HelpEntry> {
        self.beards
            .iter()
            .map(|d| HelpEntry {
                name: d.name(),
                user_help: d.user_help().unwrap_or(DEFAULT_USER_HELP),
                commands: d
                    .commands()
                    .iter()
                    .filter_map(|c| Some((c.label().into_owned(), c.help()?.to_owned())))
                    .collect(),
            })
            .collect()
    }
}
