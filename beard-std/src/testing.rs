//! Testing utilities for beard.
//!
//! This module provides utilities to make testing beards, predicates and
//! handlers easier without a real chat network.
//!
//! # Features
//!
//! - [`MockTransport`]: A transport that records every send and edit
//! - [`MessageBuilder`]: Builds inbound messages and callback queries
//! - [`RecordingHandler`]: A handler that records the messages it receives
//! - [`CountingPredicate`]: A predicate that counts its evaluations

use async_trait::async_trait;
use beard_core::{
    AsyncPredicate, BoxError, CallbackQuery, ChatId, ChatMessage, ChatSender, Document, Handler,
    Location, MessageId, MessageRef, Predicate, PredicateContext, SendOptions, Transport, User,
};
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering},
    },
    time::Duration,
};

// ============================================================================
// Mock Transport
// ============================================================================

/// A message the bot sent.
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub text: String,
    pub options: SendOptions,
}

/// An edit the bot made.
#[derive(Debug, Clone, PartialEq)]
pub struct EditedMessage {
    pub target: MessageRef,
    pub text: String,
    pub options: SendOptions,
}

/// Error returned by a [`MockTransport`] told to fail.
#[derive(Debug, thiserror::Error)]
#[error("mock transport failure")]
pub struct MockTransportError;

/// A transport that records traffic instead of sending it.
///
/// # Example
///
/// ```rust,ignore
/// let transport = Arc::new(MockTransport::new().with_username("thisbot"));
/// // ... dispatch ...
/// assert_eq!(transport.sent_texts(), vec!["pong"]);
/// ```
pub struct MockTransport {
    me: User,
    sent: Mutex<Vec<SentMessage>>,
    edits: Mutex<Vec<EditedMessage>>,
    next_id: AtomicI64,
    per_chat_ids: Option<Mutex<HashMap<ChatId, MessageId>>>,
    get_me_calls: AtomicUsize,
    get_me_delay: Option<Duration>,
    fail_sends: AtomicBool,
}

impl MockTransport {
    /// A transport for a bot named `testbot`.
    pub fn new() -> Self {
        Self {
            me: User {
                id: 1000,
                username: Some("testbot".into()),
                first_name: Some("Test Bot".into()),
            },
            sent: Mutex::new(Vec::new()),
            edits: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(100),
            per_chat_ids: None,
            get_me_calls: AtomicUsize::new(0),
            get_me_delay: None,
            fail_sends: AtomicBool::new(false),
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.me.username = Some(username.into());
        self
    }

    /// Delays every `get_me` response, to widen race windows in tests.
    pub fn with_get_me_delay(mut self, delay: Duration) -> Self {
        self.get_me_delay = Some(delay);
        self
    }

    /// Numbers sent messages per chat from 1, the way the chat network
    /// does, so different chats see the same message ids.
    pub fn with_per_chat_ids(mut self) -> Self {
        self.per_chat_ids = Some(Mutex::new(HashMap::new()));
        self
    }

    fn next_message_id(&self, chat_id: ChatId) -> MessageId {
        match &self.per_chat_ids {
            Some(ids) => {
                let mut ids = ids.lock().unwrap_or_else(PoisonError::into_inner);
                let id = ids.entry(chat_id).or_insert(0);
                *id += 1;
                *id
            }
            None => self.next_id.fetch_add(1, Ordering::SeqCst),
        }
    }

    /// Makes subsequent sends fail (or succeed again).
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|m| m.text).collect()
    }

    /// The texts sent to one chat.
    pub fn sent_to(&self, chat_id: ChatId) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|m| m.chat_id == chat_id)
            .map(|m| m.text)
            .collect()
    }

    pub fn last_sent(&self) -> Option<SentMessage> {
        self.sent().pop()
    }

    pub fn edits(&self) -> Vec<EditedMessage> {
        self.edits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last_edit(&self) -> Option<EditedMessage> {
        self.edits().pop()
    }

    pub fn get_me_calls(&self) -> usize {
        self.get_me_calls.load(Ordering::SeqCst)
    }

    /// Forgets recorded traffic.
    pub fn clear(&self) {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.edits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        options: SendOptions,
    ) -> Result<ChatMessage, BoxError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(Box::new(MockTransportError));
        }
        let message_id = self.next_message_id(chat_id);
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentMessage {
                chat_id,
                message_id,
                text: text.to_owned(),
                options,
            });
        let mut msg = ChatMessage::new(chat_id, message_id);
        msg.from = Some(self.me.clone());
        msg.text = Some(text.to_owned());
        Ok(msg)
    }

    async fn edit_message_text(
        &self,
        target: MessageRef,
        text: &str,
        options: SendOptions,
    ) -> Result<(), BoxError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(Box::new(MockTransportError));
        }
        self.edits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(EditedMessage {
                target,
                text: text.to_owned(),
                options,
            });
        Ok(())
    }

    async fn get_me(&self) -> Result<User, BoxError> {
        self.get_me_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.get_me_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.me.clone())
    }
}

// ============================================================================
// Message Builder
// ============================================================================

/// Builds inbound messages.
///
/// # Example
///
/// ```rust,ignore
/// let msg = MessageBuilder::new(42).text("/start").build();
/// ```
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    msg: ChatMessage,
}

impl MessageBuilder {
    /// A message in `chat_id` from a default user.
    pub fn new(chat_id: ChatId) -> Self {
        let mut msg = ChatMessage::new(chat_id, 1);
        msg.from = Some(Self::user());
        Self { msg }
    }

    /// The user every built message comes from.
    pub fn user() -> User {
        User {
            id: 7,
            username: Some("alice".into()),
            first_name: Some("Alice".into()),
        }
    }

    pub fn id(mut self, message_id: MessageId) -> Self {
        self.msg.message_id = message_id;
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.msg.text = Some(text.into());
        self
    }

    pub fn document(mut self, file_id: impl Into<String>) -> Self {
        self.msg.document = Some(Document {
            file_id: file_id.into(),
            file_name: None,
            mime_type: None,
        });
        self
    }

    pub fn location(mut self, latitude: f64, longitude: f64) -> Self {
        self.msg.location = Some(Location {
            latitude,
            longitude,
        });
        self
    }

    pub fn build(self) -> ChatMessage {
        self.msg
    }

    /// A callback query pressing a button on `message` with `data`.
    pub fn callback(message: &ChatMessage, data: impl Into<String>) -> CallbackQuery {
        CallbackQuery {
            id: format!("cb-{}", message.message_id),
            from: Self::user(),
            data: Some(data.into()),
            message: Some(message.clone()),
        }
    }
}

// ============================================================================
// Recording Handler
// ============================================================================

/// A handler that records every message it is invoked with.
///
/// # Example
///
/// ```rust,ignore
/// let recorder = RecordingHandler::new();
/// let cmd = Command::new("ping", recorder.handler());
/// // ... dispatch ...
/// assert_eq!(recorder.count(), 1);
/// ```
#[derive(Clone, Default)]
pub struct RecordingHandler {
    received: Arc<Mutex<Vec<ChatMessage>>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// A synchronous handler recording into this recorder.
    pub fn handler(&self) -> Handler {
        let received = self.received.clone();
        Handler::sync(move |_, msg| {
            received
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(msg.clone());
            Ok(())
        })
    }

    /// An asynchronous handler recording into this recorder and replying `reply`.
    pub fn replying(&self, reply: &'static str) -> Handler {
        let received = self.received.clone();
        Handler::from_async(move |sender: ChatSender, msg: ChatMessage| {
            let received = received.clone();
            async move {
                received
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(msg);
                sender.send_message(reply).await?;
                Ok::<(), BoxError>(())
            }
        })
    }

    pub fn received(&self) -> Vec<ChatMessage> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self) -> usize {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

// ============================================================================
// Counting Predicate
// ============================================================================

/// A predicate with a fixed answer that counts how often it was asked.
#[derive(Clone)]
pub struct CountingPredicate {
    answer: bool,
    count: Arc<AtomicUsize>,
}

impl CountingPredicate {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// A synchronous predicate sharing this counter.
    pub fn sync(&self) -> Predicate {
        let this = self.clone();
        Predicate::sync(move |_, _| {
            this.count.fetch_add(1, Ordering::SeqCst);
            this.answer
        })
    }

    /// An asynchronous predicate sharing this counter.
    pub fn awaitable(&self) -> Predicate {
        Predicate::from_async(self.clone())
    }
}

impl AsyncPredicate for CountingPredicate {
    async fn check(&self, _ctx: &PredicateContext<'_>, _msg: &ChatMessage) -> bool {
        self.count.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.answer
    }
}
