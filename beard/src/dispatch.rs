//! # Dispatch Engine
//!
//! Routes one message through an instance's commands: instance commands in
//! registration order, then the beard's declared commands in declaration
//! order. The first command whose predicate matches runs and the remaining
//! predicates are never evaluated.
//!
//! Synchronous predicates and handlers run in place; asynchronous ones are
//! awaited. Nothing here catches handler errors; the instance does.

use crate::{beard::DynBeard, context::BeardContext};
use beard_core::{ChatMessage, DirectHandler, DispatchError, Handler, Predicate};
use beard_std::command::Command;

/// Outcome of routing one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    /// The command at `index` in instance-then-class order ran.
    Handled { index: usize },
    /// No predicate matched; the message was dropped.
    Unmatched,
}

impl Dispatched {
    pub fn is_handled(&self) -> bool {
        matches!(self, Dispatched::Handled { .. })
    }
}

/// Finds the first matching command and runs its handler.
pub async fn route(
    beard: &mut dyn DynBeard,
    ctx: &mut BeardContext,
    class_commands: &[Command],
    msg: &ChatMessage,
) -> Result<Dispatched, DispatchError> {
    let Some((index, handler)) = select(ctx, class_commands, msg).await else {
        tracing::trace!(parent: ctx.logger().span(), "no command matched");
        return Ok(Dispatched::Unmatched);
    };
    invoke(beard, ctx, &handler, msg).await?;
    Ok(Dispatched::Handled { index })
}

/// Index and handler of the first command matching `msg`.
pub async fn select(
    ctx: &BeardContext,
    class_commands: &[Command],
    msg: &ChatMessage,
) -> Option<(usize, Handler)> {
    let pctx = ctx.predicate_context();
    let commands = ctx.instance_commands().iter().chain(class_commands);
    for (index, command) in commands.enumerate() {
        let matched = match command.predicate() {
            Predicate::Sync(check) => check(&pctx, msg),
            Predicate::Async(check) => check.check_dyn(&pctx, msg).await,
        };
        if matched {
            tracing::debug!(
                parent: ctx.logger().span(),
                command = %command.label(),
                index,
                "command matched"
            );
            return Some((index, command.handler().clone()));
        }
    }
    None
}

/// Runs `handler` for `msg`.
pub async fn invoke(
    beard: &mut dyn DynBeard,
    ctx: &mut BeardContext,
    handler: &Handler,
    msg: &ChatMessage,
) -> Result<(), DispatchError> {
    match handler {
        Handler::Direct(DirectHandler::Sync(f)) => f(ctx.sender(), msg)?,
        Handler::Direct(DirectHandler::Async(f)) => f(ctx.sender().clone(), msg.clone()).await?,
        Handler::Method(name) => beard.invoke_dyn(name, ctx, msg).await?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beard::Beard;
    use beard_core::{BotIdentity, BoxError, Transport};
    use beard_std::testing::{CountingPredicate, MessageBuilder, MockTransport, RecordingHandler};
    use std::sync::Arc;

    struct Quiet;

    impl Beard for Quiet {
        const NAME: &'static str = "Quiet";

        fn create(_: &mut BeardContext) -> Result<Self, BoxError> {
            Ok(Quiet)
        }
    }

    fn context() -> BeardContext {
        let transport: Arc<dyn Transport> = Arc::new(MockTransport::new());
        let identity = Arc::new(BotIdentity::new(transport.clone()));
        BeardContext::builder("Quiet", 1, transport, identity).build()
    }

    #[tokio::test]
    async fn first_match_wins_and_short_circuits() {
        let mut ctx = context();
        let (a, b, c, d) = (
            CountingPredicate::new(false),
            CountingPredicate::new(true),
            CountingPredicate::new(true),
            CountingPredicate::new(true),
        );
        let (hit_b, hit_c) = (RecordingHandler::new(), RecordingHandler::new());
        ctx.register_command(Command::new(a.sync(), RecordingHandler::new().handler()));
        ctx.register_command(Command::new(b.awaitable(), hit_b.handler()));
        let class = vec![
            Command::new(c.sync(), hit_c.handler()),
            Command::new(d.awaitable(), RecordingHandler::new().handler()),
        ];

        let msg = MessageBuilder::new(1).text("hi").build();
        let outcome = route(&mut Quiet, &mut ctx, &class, &msg).await.unwrap();

        assert_eq!(outcome, Dispatched::Handled { index: 1 });
        assert_eq!(hit_b.count(), 1);
        assert_eq!(hit_c.count(), 0);
        assert_eq!((a.count(), b.count(), c.count(), d.count()), (1, 1, 0, 0));
    }

    #[tokio::test]
    async fn unmatched_runs_nothing() {
        let mut ctx = context();
        let never = CountingPredicate::new(false);
        let class = vec![Command::new(never.sync(), "nothing")];
        let msg = MessageBuilder::new(1).build();
        let outcome = route(&mut Quiet, &mut ctx, &class, &msg).await.unwrap();
        assert_eq!(outcome, Dispatched::Unmatched);
        assert!(!outcome.is_handled());
        assert_eq!(never.count(), 1);
    }

    #[tokio::test]
    async fn unknown_method_is_a_dispatch_error() {
        let mut ctx = context();
        let class = vec![Command::new(beard_core::Predicate::always(), "missing")];
        let msg = MessageBuilder::new(1).build();
        let err = route(&mut Quiet, &mut ctx, &class, &msg).await.unwrap_err();
        assert!(matches!(err, DispatchError::UnknownMethod { .. }));
    }
}
