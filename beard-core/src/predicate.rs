//! # Predicates
//!
//! A predicate decides whether a message should trigger a command.
//!
//! Predicates come in two capabilities and the dispatch engine treats them
//! differently:
//!
//! - [`Predicate::Sync`] is a plain function, evaluated in place without
//!   yielding to the runtime.
//! - [`Predicate::Async`] implements [`AsyncPredicate`] and is awaited. Use it
//!   when the decision needs I/O, such as looking up the bot's own username.
//!
//! Both receive a [`PredicateContext`] describing the instance doing the
//! evaluation. A predicate must never fail on a message that merely lacks
//! the field it inspects; it answers `false`.

use crate::{
    identity::BotIdentity,
    message::{ChatId, ChatMessage},
};
use std::{future::Future, pin::Pin, sync::Arc};

/// What a predicate may know about the instance evaluating it.
#[derive(Debug, Clone, Copy)]
pub struct PredicateContext<'a> {
    /// Name of the beard that owns the command.
    pub beard: &'a str,
    /// Chat the instance is bound to.
    pub chat_id: ChatId,
    /// The bot's identity, resolved lazily.
    pub identity: &'a BotIdentity,
}

/// A predicate that needs to await before deciding.
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not an `AsyncPredicate`",
    label = "missing `AsyncPredicate` implementation",
    note = "Async predicates must implement `check`; plain functions can use `Predicate::sync`."
)]
pub trait AsyncPredicate: Send + Sync + 'static {
    /// Decides whether `msg` matches.
    fn check(
        &self,
        ctx: &PredicateContext<'_>,
        msg: &ChatMessage,
    ) -> impl Future<Output = bool> + Send;
}

/// Object-safe version of [`AsyncPredicate`].
pub trait DynAsyncPredicate: Send + Sync + 'static {
    fn check_dyn<'a>(
        &'a self,
        ctx: &'a PredicateContext<'a>,
        msg: &'a ChatMessage,
    ) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>>;
}

impl<P: AsyncPredicate> DynAsyncPredicate for P {
    fn check_dyn<'a>(
        &'a self,
        ctx: &'a PredicateContext<'a>,
        msg: &'a ChatMessage,
    ) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>> {
        Box::pin(self.check(ctx, msg))
    }
}

/// Signature of a synchronous predicate.
pub type SyncPredicateFn = dyn Fn(&PredicateContext<'_>, &ChatMessage) -> bool + Send + Sync;

/// A predicate of either capability.
#[derive(Clone)]
pub enum Predicate {
    Sync(Arc<SyncPredicateFn>),
    Async(Arc<dyn DynAsyncPredicate>),
}

impl Predicate {
    /// Wraps a plain function.
    pub fn sync<F>(f: F) -> Self
    where
        F: Fn(&PredicateContext<'_>, &ChatMessage) -> bool + Send + Sync + 'static,
    {
        Predicate::Sync(Arc::new(f))
    }

    /// Wraps an awaitable predicate.
    pub fn from_async<P: AsyncPredicate>(predicate: P) -> Self {
        Predicate::Async(Arc::new(predicate))
    }

    /// A predicate matching every message.
    pub fn always() -> Self {
        Predicate::sync(|_, _| true)
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Predicate::Async(_))
    }

    /// Evaluates the predicate, awaiting only if it is asynchronous.
    pub async fn evaluate(&self, ctx: &PredicateContext<'_>, msg: &ChatMessage) -> bool {
        match self {
            Predicate::Sync(f) => f(ctx, msg),
            Predicate::Async(p) => p.check_dyn(ctx, msg).await,
        }
    }
}

impl std::fmt::Debug for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Predicate::Sync(_) => f.write_str("Predicate::Sync"),
            Predicate::Async(_) => f.write_str("Predicate::Async"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::BoxError,
        message::{MessageRef, User},
        transport::{SendOptions, Transport},
    };
    use async_trait::async_trait;

    struct NoTransport;

    #[async_trait]
    impl Transport for NoTransport {
        async fn send_message(
            &self,
            chat_id: ChatId,
            _text: &str,
            _options: SendOptions,
        ) -> Result<ChatMessage, BoxError> {
            Ok(ChatMessage::new(chat_id, 0))
        }

        async fn edit_message_text(
            &self,
            _target: MessageRef,
            _text: &str,
            _options: SendOptions,
        ) -> Result<(), BoxError> {
            Ok(())
        }

        async fn get_me(&self) -> Result<User, BoxError> {
            Err("offline".into())
        }
    }

    struct ChatIs(ChatId);

    impl AsyncPredicate for ChatIs {
        async fn check(&self, ctx: &PredicateContext<'_>, _msg: &ChatMessage) -> bool {
            tokio::task::yield_now().await;
            ctx.chat_id == self.0
        }
    }

    #[tokio::test]
    async fn evaluates_both_capabilities() {
        let identity = BotIdentity::new(Arc::new(NoTransport));
        let ctx = PredicateContext {
            beard: "Test",
            chat_id: 7,
            identity: &identity,
        };
        let mut msg = ChatMessage::new(7, 1);

        let has_text = Predicate::sync(|_, m| m.text.is_some());
        assert!(!has_text.is_async());
        assert!(!has_text.evaluate(&ctx, &msg).await);
        msg.text = Some("x".into());
        assert!(has_text.evaluate(&ctx, &msg).await);

        let in_chat = Predicate::from_async(ChatIs(7));
        assert!(in_chat.is_async());
        assert!(in_chat.evaluate(&ctx, &msg).await);
        assert!(!Predicate::from_async(ChatIs(8)).evaluate(&ctx, &msg).await);

        assert!(Predicate::always().evaluate(&ctx, &msg).await);
    }
}
