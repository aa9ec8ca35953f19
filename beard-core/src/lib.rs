//! # beard-core
//!
//! Core types for the beard chat plugin framework.
//!
//! This crate has minimal dependencies and is meant to be imported by beards
//! and transport adapters that do not need the full `beard` runtime.
//!
//! # Layers
//!
//! ## Message model ([`ChatMessage`], [`CallbackQuery`], [`Update`])
//!
//! The shapes the transport delivers. Only fields the dispatch core reads are
//! modelled.
//!
//! ## Predicates ([`Predicate`])
//!
//! Decide whether a message triggers a command. Either a plain function
//! evaluated in place, or an [`AsyncPredicate`] that is awaited.
//!
//! ## Handlers ([`Handler`])
//!
//! What runs on a match: a function value called directly, or a method name
//! resolved against the beard instance at dispatch time.
//!
//! ## Ownership codec ([`OwnershipCodec`])
//!
//! Tags callback payloads with the owning instance so beards sharing one
//! callback channel only ever act on their own buttons.
//!
//! ## Collaborators ([`Transport`], [`Table`], [`BotIdentity`])
//!
//! The chat connection and storage the core is embedded with. Both are owned
//! by the host process.
//!
//! # Error Types
//!
//! - [`BeardError`] - Top-level error type
//! - [`CodecError`] - Ownership decoding failures
//! - [`DispatchError`] - Routing failures
//! - [`PaginationError`] - Pagination failures

#![deny(clippy::wildcard_imports)]

mod codec;
mod error;
mod handler;
mod identity;
mod message;
mod predicate;
mod storage;
mod transport;

// Re-exports
pub use codec::{BeardUid, OwnershipCodec};
pub use error::{
    BeardError, BoxError, CodecError, DispatchError, PaginationError, error_chain,
};
pub use handler::{AsyncHandlerFn, DirectHandler, Handler, HandlerResult, SyncHandlerFn};
pub use identity::{BotIdentity, MissingUsername};
pub use message::{
    CallbackQuery, Chat, ChatId, ChatMessage, ContentKind, Document, Location, MessageId,
    MessageRef, Update, User,
};
pub use predicate::{AsyncPredicate, DynAsyncPredicate, Predicate, PredicateContext, SyncPredicateFn};
pub use storage::{Record, Table, TableStore, record_matches, table_name};
pub use transport::{ChatSender, InlineButton, InlineKeyboard, ParseMode, SendOptions, Transport};
