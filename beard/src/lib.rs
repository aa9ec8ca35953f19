//! # beard - Per-Chat Plugin Dispatch
//!
//! `beard` runs chat plugins ("beards") against a stream of chat updates.
//! Each beard gets one instance per chat, created on demand and torn down when
//! idle. Messages are routed through each instance's commands in order; button
//! presses are routed back to the instance that created the button.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use beard::prelude::*;
//!
//! struct Echo;
//!
//! impl Beard for Echo {
//!     const NAME: &'static str = "Echo";
//!
//!     fn commands() -> Vec<Command> {
//!         vec![Command::new("echo", "echo").with_help("Repeats you.")]
//!     }
//!
//!     fn create(_: &mut BeardContext) -> Result<Self, BoxError> {
//!         Ok(Echo)
//!     }
//!
//!     async fn invoke(
//!         &mut self,
//!         method: &str,
//!         ctx: &mut BeardContext,
//!         msg: &ChatMessage,
//!     ) -> Result<(), DispatchError> {
//!         match method {
//!             "echo" => {
//!                 ctx.send_message(msg.text().unwrap_or_default()).await?;
//!                 Ok(())
//!             }
//!             _ => Err(unknown_method::<Self>(method)),
//!         }
//!     }
//! }
//!
//! let mut registry = Registry::new();
//! registry.register_beard::<Echo>()?;
//! let delegator = Arc::new(Delegator::builder(registry, transport).build()?);
//! delegator.spawn_reaper();
//! delegator.handle_update(&update).await;
//! ```

#![deny(clippy::wildcard_imports)]

pub mod beard;
pub mod config;
pub mod context;
pub mod delegator;
pub mod dispatch;
pub mod formatter;
pub mod instance;
pub mod logger;
pub mod paginator;
pub mod registry;

pub use beard_core::{
    // Errors
    BeardError,
    BeardUid,
    BotIdentity,
    BoxError,
    // Message model
    CallbackQuery,
    ChatId,
    ChatMessage,
    // Collaborators
    ChatSender,
    CodecError,
    ContentKind,
    DispatchError,
    // Commands
    Handler,
    HandlerResult,
    InlineButton,
    InlineKeyboard,
    OwnershipCodec,
    PaginationError,
    ParseMode,
    Predicate,
    Record,
    SendOptions,
    Table,
    TableStore,
    Transport,
    Update,
    User,
};
pub use beard_std::command::{Command, Trigger};

pub use crate::{
    beard::{Beard, BeardDescriptor, BeardSetup, DynBeard, unknown_method},
    config::{Config, ConfigError},
    context::BeardContext,
    delegator::{Delegator, DeliveryReport},
    dispatch::Dispatched,
    formatter::FormatterRegistry,
    paginator::{Direction, Navigation, Paginator, Window},
    registry::{DEFAULT_USER_HELP, HelpEntry, Registry, RegistryError},
};

/// Standard predicates.
pub mod predicates {
    pub use beard_std::predicates::{Filters, RegexPredicate, SlashCommand, regex, slash_command};
}

/// Testing utilities.
pub mod testing {
    pub use beard_std::{
        storage::MemoryStore,
        testing::{
            CountingPredicate, EditedMessage, MessageBuilder, MockTransport, RecordingHandler,
            SentMessage,
        },
    };
}

/// Prelude module - common imports for beard.
///
/// # Usage
///
/// ```rust,ignore
/// use beard::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Beard, BeardContext, BoxError, CallbackQuery, ChatMessage, Command, Config, Delegator,
        DispatchError, Filters, Handler, HandlerResult, Predicate, Registry, unknown_method,
    };
    pub use std::sync::Arc;
}

pub use crate::predicates::Filters;

#[doc(hidden)]
pub use inventory;
