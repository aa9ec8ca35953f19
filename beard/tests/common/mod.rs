#![allow(dead_code)]

use beard::{
    Beard, BeardContext, BeardSetup, BoxError, CallbackQuery, ChatId, ChatMessage, ChatSender,
    Command, Config, Delegator, DispatchError, Handler, HandlerResult, Predicate, Registry,
    TableStore, unknown_method,
    testing::{MemoryStore, MessageBuilder, MockTransport},
};
use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub delegator: Arc<Delegator>,
    pub transport: Arc<MockTransport>,
    pub store: Arc<MemoryStore>,
}

pub fn harness(registry: Registry) -> Harness {
    harness_with(registry, Config::default())
}

/// Routes `tracing` output through the test harness; `RUST_LOG` filters it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn harness_with(registry: Registry, config: Config) -> Harness {
    harness_on(
        registry,
        config,
        Arc::new(MockTransport::new().with_username("thisbot")),
    )
}

pub fn harness_on(registry: Registry, config: Config, transport: Arc<MockTransport>) -> Harness {
    init_tracing();
    let store = Arc::new(MemoryStore::new());
    let delegator = Delegator::new(
        registry,
        transport.clone(),
        store.clone() as Arc<dyn TableStore>,
        config,
    )
    .unwrap();
    Harness {
        delegator: Arc::new(delegator),
        transport,
        store,
    }
}

pub fn text(chat_id: i64, text: &str) -> ChatMessage {
    MessageBuilder::new(chat_id).text(text).build()
}

async fn reply(ctx: &BeardContext, text: &str) -> Result<(), DispatchError> {
    ctx.send_message(text).await?;
    Ok(())
}

// ============================================================================
// Ordered: instance commands [A, B], class commands [C, D]
// ============================================================================

pub static C_EVALUATIONS: AtomicUsize = AtomicUsize::new(0);
pub static D_EVALUATIONS: AtomicUsize = AtomicUsize::new(0);

pub struct Ordered;

impl Beard for Ordered {
    const NAME: &'static str = "Ordered";

    fn commands() -> Vec<Command> {
        vec![
            Command::new(
                Predicate::sync(|_, msg| {
                    C_EVALUATIONS.fetch_add(1, Ordering::SeqCst);
                    msg.text().is_some_and(|t| t.contains('c'))
                }),
                "c",
            ),
            Command::new(
                Predicate::sync(|_, _| {
                    D_EVALUATIONS.fetch_add(1, Ordering::SeqCst);
                    true
                }),
                "d",
            ),
        ]
    }

    fn create(ctx: &mut BeardContext) -> Result<Self, BoxError> {
        ctx.register_command(Command::new(
            Predicate::sync(|_, msg| msg.text() == Some("a")),
            Handler::from_async(|sender: ChatSender, _msg: ChatMessage| async move {
                sender.send_message("A").await?;
                Ok::<(), BoxError>(())
            }),
        ));
        ctx.register_command(Command::new(
            Predicate::sync(|_, msg| msg.text().is_some_and(|t| t.contains('b'))),
            "b",
        ));
        Ok(Ordered)
    }

    async fn invoke(
        &mut self,
        method: &str,
        ctx: &mut BeardContext,
        _msg: &ChatMessage,
    ) -> Result<(), DispatchError> {
        match method {
            "b" => reply(ctx, "B").await,
            "c" => reply(ctx, "C").await,
            "d" => reply(ctx, "D").await,
            _ => Err(unknown_method::<Self>(method)),
        }
    }
}

// ============================================================================
// Foo: a single slash command
// ============================================================================

pub struct Foo;

impl Beard for Foo {
    const NAME: &'static str = "Foo";

    fn commands() -> Vec<Command> {
        vec![Command::new("foo", "foo").with_help("Says foo.")]
    }

    fn create(_: &mut BeardContext) -> Result<Self, BoxError> {
        Ok(Foo)
    }

    async fn invoke(
        &mut self,
        method: &str,
        ctx: &mut BeardContext,
        _msg: &ChatMessage,
    ) -> Result<(), DispatchError> {
        match method {
            "foo" => reply(ctx, "foo!").await,
            _ => Err(unknown_method::<Self>(method)),
        }
    }
}

// ============================================================================
// Paginated beards
// ============================================================================

pub const NUMBER_FORMATTER: &str = "number";

fn register_number_formatter(setup: &BeardSetup<'_>) -> Result<(), BoxError> {
    setup
        .formatters
        .register_typed(NUMBER_FORMATTER, |n: i64| format!("<b>{n}</b>"));
    Ok(())
}

pub struct Search;

impl Beard for Search {
    const NAME: &'static str = "Search";
    const PAGINATED: bool = true;
    const USER_HELP: Option<&'static str> = Some("Pages through numbers.");

    fn commands() -> Vec<Command> {
        vec![Command::new("search", "search").with_help("Shows 2, 3 and 4.")]
    }

    fn setup(setup: &BeardSetup<'_>) -> Result<(), BoxError> {
        register_number_formatter(setup)
    }

    fn create(_: &mut BeardContext) -> Result<Self, BoxError> {
        Ok(Search)
    }

    async fn invoke(
        &mut self,
        method: &str,
        ctx: &mut BeardContext,
        _msg: &ChatMessage,
    ) -> Result<(), DispatchError> {
        match method {
            "search" => {
                let paginator = ctx
                    .paginator()
                    .ok_or_else(|| DispatchError::Handler("pagination disabled".into()))?;
                paginator
                    .send_paginated_message([2, 3, 4], NUMBER_FORMATTER)
                    .await
                    .map_err(|e| DispatchError::Handler(Box::new(e)))?;
                Ok(())
            }
            _ => Err(unknown_method::<Self>(method)),
        }
    }
}

pub struct Other;

impl Beard for Other {
    const NAME: &'static str = "Other";
    const PAGINATED: bool = true;

    fn commands() -> Vec<Command> {
        vec![Command::new("other", "other")]
    }

    fn setup(setup: &BeardSetup<'_>) -> Result<(), BoxError> {
        register_number_formatter(setup)
    }

    fn create(_: &mut BeardContext) -> Result<Self, BoxError> {
        Ok(Other)
    }

    async fn invoke(
        &mut self,
        method: &str,
        ctx: &mut BeardContext,
        _msg: &ChatMessage,
    ) -> Result<(), DispatchError> {
        match method {
            "other" => {
                let paginator = ctx
                    .paginator()
                    .ok_or_else(|| DispatchError::Handler("pagination disabled".into()))?;
                paginator
                    .send_paginated_message([10, 20], NUMBER_FORMATTER)
                    .await
                    .map_err(|e| DispatchError::Handler(Box::new(e)))?;
                Ok(())
            }
            _ => Err(unknown_method::<Self>(method)),
        }
    }
}

// ============================================================================
// Tally: a paginated beard that records the presses left to it
// ============================================================================

/// `(chat, callback data)` of every press that reached `on_callback_query`.
pub static TALLY_PRESSES: Mutex<Vec<(ChatId, Option<String>)>> = Mutex::new(Vec::new());
/// Chats whose Tally instance had a failure contained.
pub static TALLY_ERRORS: Mutex<Vec<ChatId>> = Mutex::new(Vec::new());

/// Callback data of the presses Tally saw in `chat_id`.
pub fn tally_presses(chat_id: ChatId) -> Vec<Option<String>> {
    TALLY_PRESSES
        .lock()
        .unwrap()
        .iter()
        .filter(|(chat, _)| *chat == chat_id)
        .map(|(_, data)| data.clone())
        .collect()
}

pub fn tally_errors(chat_id: ChatId) -> usize {
    TALLY_ERRORS
        .lock()
        .unwrap()
        .iter()
        .filter(|chat| **chat == chat_id)
        .count()
}

pub struct Tally;

impl Beard for Tally {
    const NAME: &'static str = "Tally";
    const PAGINATED: bool = true;

    fn commands() -> Vec<Command> {
        vec![Command::new("tally", "tally")]
    }

    fn setup(setup: &BeardSetup<'_>) -> Result<(), BoxError> {
        register_number_formatter(setup)
    }

    fn create(_: &mut BeardContext) -> Result<Self, BoxError> {
        Ok(Tally)
    }

    async fn invoke(
        &mut self,
        method: &str,
        ctx: &mut BeardContext,
        _msg: &ChatMessage,
    ) -> Result<(), DispatchError> {
        match method {
            "tally" => {
                let paginator = ctx
                    .paginator()
                    .ok_or_else(|| DispatchError::Handler("pagination disabled".into()))?;
                paginator
                    .send_paginated_message([1, 2], NUMBER_FORMATTER)
                    .await
                    .map_err(|e| DispatchError::Handler(Box::new(e)))?;
                Ok(())
            }
            _ => Err(unknown_method::<Self>(method)),
        }
    }

    async fn on_callback_query(
        &mut self,
        ctx: &mut BeardContext,
        query: &CallbackQuery,
    ) -> HandlerResult {
        TALLY_PRESSES
            .lock()
            .unwrap()
            .push((ctx.chat_id(), query.data.clone()));
        Ok(())
    }

    fn on_error(&mut self, ctx: &BeardContext, _error: &DispatchError) {
        TALLY_ERRORS.lock().unwrap().push(ctx.chat_id());
    }
}

// ============================================================================
// Fragile: one failing and one working command
// ============================================================================

pub static FRAGILE_ERRORS: AtomicUsize = AtomicUsize::new(0);

pub struct Fragile;

impl Beard for Fragile {
    const NAME: &'static str = "Fragile";

    fn commands() -> Vec<Command> {
        vec![
            Command::new("boom", Handler::sync(|_, _| Err("kaboom".into()))),
            Command::new("ok", "ok"),
        ]
    }

    fn create(_: &mut BeardContext) -> Result<Self, BoxError> {
        Ok(Fragile)
    }

    async fn invoke(
        &mut self,
        method: &str,
        ctx: &mut BeardContext,
        _msg: &ChatMessage,
    ) -> Result<(), DispatchError> {
        match method {
            "ok" => reply(ctx, "fine").await,
            _ => Err(unknown_method::<Self>(method)),
        }
    }

    fn on_error(&mut self, _ctx: &BeardContext, _error: &DispatchError) {
        FRAGILE_ERRORS.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Lingering: declares its own idle timeout
// ============================================================================

pub struct Lingering;

impl Beard for Lingering {
    const NAME: &'static str = "Lingering";
    const TIMEOUT: Option<Duration> = Some(Duration::from_secs(30));

    fn create(_: &mut BeardContext) -> Result<Self, BoxError> {
        Ok(Lingering)
    }
}
