//! # Handlers
//!
//! The action half of a command. A handler is either a function value the
//! engine calls directly, or the name of a method the engine resolves on the
//! beard instance at dispatch time.
//!
//! Direct handlers receive a [`ChatSender`] bound to the instance's chat and
//! the triggering message. Method handlers are resolved through the beard's
//! own method table and additionally get access to the instance state.

use crate::{error::BoxError, message::ChatMessage, transport::ChatSender};
use futures::future::BoxFuture;
use std::{borrow::Cow, future::Future, sync::Arc};

/// Result of running a handler.
pub type HandlerResult = Result<(), BoxError>;

/// Signature of a synchronous direct handler.
pub type SyncHandlerFn = dyn Fn(&ChatSender, &ChatMessage) -> HandlerResult + Send + Sync;

/// Signature of an asynchronous direct handler.
pub type AsyncHandlerFn =
    dyn Fn(ChatSender, ChatMessage) -> BoxFuture<'static, HandlerResult> + Send + Sync;

/// A function value invoked directly by the engine.
#[derive(Clone)]
pub enum DirectHandler {
    /// Called in place.
    Sync(Arc<SyncHandlerFn>),
    /// Awaited.
    Async(Arc<AsyncHandlerFn>),
}

/// What to run when a command matches.
#[derive(Clone)]
pub enum Handler {
    Direct(DirectHandler),
    /// A method resolved against the beard instance by name.
    Method(Cow<'static, str>),
}

impl Handler {
    /// Refers to a beard method by name.
    pub fn method(name: impl Into<Cow<'static, str>>) -> Self {
        Handler::Method(name.into())
    }

    /// Wraps a synchronous function.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&ChatSender, &ChatMessage) -> HandlerResult + Send + Sync + 'static,
    {
        Handler::Direct(DirectHandler::Sync(Arc::new(f)))
    }

    /// Wraps an asynchronous function.
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(ChatSender, ChatMessage) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let f: Arc<AsyncHandlerFn> = Arc::new(
            move |sender: ChatSender, msg: ChatMessage| -> BoxFuture<'static, HandlerResult> {
                Box::pin(f(sender, msg))
            },
        );
        Handler::Direct(DirectHandler::Async(f))
    }

    /// The method name, for method handlers.
    pub fn method_name(&self) -> Option<&str> {
        match self {
            Handler::Method(name) => Some(name),
            Handler::Direct(_) => None,
        }
    }
}

impl From<&'static str> for Handler {
    fn from(name: &'static str) -> Self {
        Handler::Method(Cow::Borrowed(name))
    }
}

impl From<String> for Handler {
    fn from(name: String) -> Self {
        Handler::Method(Cow::Owned(name))
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Handler::Direct(DirectHandler::Sync(_)) => f.write_str("Handler::Direct(Sync)"),
            Handler::Direct(DirectHandler::Async(_)) => f.write_str("Handler::Direct(Async)"),
            Handler::Method(name) => write!(f, "Handler::Method({name})"),
        }
    }
}
