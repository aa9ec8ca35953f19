//! # Beards
//!
//! A beard is a chat plugin. The [`Beard`] trait declares, at the type level,
//! what the plugin is called, which commands it answers and how long an idle
//! instance lives; its methods are the instance behaviour.
//!
//! One instance exists per chat the beard has seen recently. It is created
//! lazily by the delegator on the first event for that chat and torn down
//! after [`Beard::TIMEOUT`] without events.
//!
//! # Static vs Dynamic Dispatch
//!
//! [`Beard`] uses native `async fn` and is implemented by plugin types. The
//! delegator holds instances as [`DynBeard`] trait objects, which every
//! [`Beard`] implements automatically.

use crate::{config::Config, context::BeardContext, formatter::FormatterRegistry};
use beard_core::{
    BoxError, CallbackQuery, ChatMessage, DispatchError, HandlerResult, error_chain,
};
use beard_std::command::Command;
use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

/// A chat plugin.
///
/// # Example
///
/// ```rust,ignore
/// struct Echo;
///
/// impl Beard for Echo {
///     const NAME: &'static str = "Echo";
///
///     fn commands() -> Vec<Command> {
///         vec![Command::new("echo", "echo").with_help("Repeats you.")]
///     }
///
///     fn create(_: &mut BeardContext) -> Result<Self, BoxError> {
///         Ok(Echo)
///     }
///
///     async fn invoke(
///         &mut self,
///         method: &str,
///         ctx: &mut BeardContext,
///         msg: &ChatMessage,
///     ) -> Result<(), DispatchError> {
///         match method {
///             "echo" => {
///                 ctx.send_message(msg.text().unwrap_or_default()).await?;
///                 Ok(())
///             }
///             _ => Err(unknown_method::<Self>(method)),
///         }
///     }
/// }
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a `Beard`",
    label = "missing `Beard` implementation",
    note = "Beards must set `NAME` and implement `create`."
)]
pub trait Beard: Send + Sync + Sized + 'static {
    /// Unique name. Must not contain `:`.
    const NAME: &'static str;

    /// Marks a shared base that is never registered itself.
    const IS_BASE: bool = false;

    /// Idle time after which an instance is torn down. `None` uses the
    /// configured default.
    const TIMEOUT: Option<Duration> = None;

    /// Help text shown in beard listings.
    const USER_HELP: Option<&'static str> = None;

    /// Gives instances a [`Paginator`](crate::paginator::Paginator).
    const PAGINATED: bool = false;

    /// Text sent when a handler fails. `None` uses the configured apology.
    const APOLOGY: Option<&'static str> = None;

    /// Commands shared by every instance, in evaluation order.
    fn commands() -> Vec<Command> {
        Vec::new()
    }

    /// Runs once per beard when the delegator is built.
    ///
    /// The usual place to register formatters.
    fn setup(setup: &BeardSetup<'_>) -> Result<(), BoxError> {
        let _ = setup;
        Ok(())
    }

    /// Creates the instance for the chat `ctx` is bound to.
    fn create(ctx: &mut BeardContext) -> Result<Self, BoxError>;

    /// Runs the method a [`Handler::Method`](beard_core::Handler::Method)
    /// command names.
    fn invoke(
        &mut self,
        method: &str,
        ctx: &mut BeardContext,
        msg: &ChatMessage,
    ) -> impl Future<Output = Result<(), DispatchError>> + Send {
        let _ = (ctx, msg);
        let err = unknown_method::<Self>(method);
        async move { Err(err) }
    }

    /// Sees every message for the chat, before command routing.
    fn on_chat_message(
        &mut self,
        ctx: &mut BeardContext,
        msg: &ChatMessage,
    ) -> impl Future<Output = HandlerResult> + Send {
        let _ = (ctx, msg);
        async { Ok(()) }
    }

    /// Sees every callback query for the chat that pagination did not consume.
    fn on_callback_query(
        &mut self,
        ctx: &mut BeardContext,
        query: &CallbackQuery,
    ) -> impl Future<Output = HandlerResult> + Send {
        let _ = (ctx, query);
        async { Ok(()) }
    }

    /// Called after a handler failed and the apology was sent.
    fn on_error(&mut self, ctx: &BeardContext, error: &DispatchError) {
        tracing::debug!(
            parent: ctx.logger().span(),
            error = %error_chain(error),
            "handler failed"
        );
    }
}

/// The error a beard returns from [`Beard::invoke`] for a name it does not know.
pub fn unknown_method<B: Beard>(method: &str) -> DispatchError {
    DispatchError::UnknownMethod {
        beard: B::NAME.to_owned(),
        method: method.to_owned(),
    }
}

/// Boxed future returned by [`DynBeard`] methods.
pub type BoxBeardFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Dynamic object-safe version of [`Beard`].
pub trait DynBeard: Send + Sync + 'static {
    fn invoke_dyn<'a>(
        &'a mut self,
        method: &'a str,
        ctx: &'a mut BeardContext,
        msg: &'a ChatMessage,
    ) -> BoxBeardFuture<'a, Result<(), DispatchError>>;

    fn on_chat_message_dyn<'a>(
        &'a mut self,
        ctx: &'a mut BeardContext,
        msg: &'a ChatMessage,
    ) -> BoxBeardFuture<'a, HandlerResult>;

    fn on_callback_query_dyn<'a>(
        &'a mut self,
        ctx: &'a mut BeardContext,
        query: &'a CallbackQuery,
    ) -> BoxBeardFuture<'a, HandlerResult>;

    fn on_error_dyn(&mut self, ctx: &BeardContext, error: &DispatchError);
}

impl<B: Beard> DynBeard for B {
    fn invoke_dyn<'a>(
        &'a mut self,
        method: &'a str,
        ctx: &'a mut BeardContext,
        msg: &'a ChatMessage,
    ) -> BoxBeardFuture<'a, Result<(), DispatchError>> {
        Box::pin(self.invoke(method, ctx, msg))
    }

    fn on_chat_message_dyn<'a>(
        &'a mut self,
        ctx: &'a mut BeardContext,
        msg: &'a ChatMessage,
    ) -> BoxBeardFuture<'a, HandlerResult> {
        Box::pin(self.on_chat_message(ctx, msg))
    }

    fn on_callback_query_dyn<'a>(
        &'a mut self,
        ctx: &'a mut BeardContext,
        query: &'a CallbackQuery,
    ) -> BoxBeardFuture<'a, HandlerResult> {
        Box::pin(self.on_callback_query(ctx, query))
    }

    fn on_error_dyn(&mut self, ctx: &BeardContext, error: &DispatchError) {
        self.on_error(ctx, error);
    }
}

/// What [`Beard::setup`] may touch.
pub struct BeardSetup<'a> {
    pub formatters: &'a FormatterRegistry,
    pub config: &'a Config,
}

type CreateFn = fn(&mut BeardContext) -> Result<Box<dyn DynBeard>, BoxError>;
type SetupFn = fn(&BeardSetup<'_>) -> Result<(), BoxError>;

/// Everything the registry and delegator need to know about one beard type.
#[derive(Clone)]
pub struct BeardDescriptor {
    name: &'static str,
    user_help: Option<&'static str>,
    is_base: bool,
    timeout: Option<Duration>,
    paginated: bool,
    apology: Option<&'static str>,
    commands: Arc<[Command]>,
    create: CreateFn,
    setup: SetupFn,
}

impl BeardDescriptor {
    /// Describes `B`, collecting its declared commands once.
    pub fn of<B: Beard>() -> Self {
        Self {
            name: B::NAME,
            user_help: B::USER_HELP,
            is_base: B::IS_BASE,
            timeout: B::TIMEOUT,
            paginated: B::PAGINATED,
            apology: B::APOLOGY,
            commands: B::commands().into(),
            create: create_boxed::<B>,
            setup: B::setup,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn user_help(&self) -> Option<&'static str> {
        self.user_help
    }

    pub fn is_base(&self) -> bool {
        self.is_base
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn is_paginated(&self) -> bool {
        self.paginated
    }

    pub fn apology(&self) -> Option<&'static str> {
        self.apology
    }

    /// Class commands in declaration order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn create(&self, ctx: &mut BeardContext) -> Result<Box<dyn DynBeard>, BoxError> {
        (self.create)(ctx)
    }

    pub fn setup(&self, setup: &BeardSetup<'_>) -> Result<(), BoxError> {
        (self.setup)(setup)
    }
}

fn create_boxed<B: Beard>(ctx: &mut BeardContext) -> Result<Box<dyn DynBeard>, BoxError> {
    Ok(Box::new(B::create(ctx)?))
}

impl std::fmt::Debug for BeardDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeardDescriptor")
            .field("name", &self.name)
            .field("is_base", &self.is_base)
            .field("timeout", &self.timeout)
            .field("paginated", &self.paginated)
            .field("commands", &self.commands.len())
            .finish_non_exhaustive()
    }
}
