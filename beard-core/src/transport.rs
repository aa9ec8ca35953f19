//! The chat transport collaborator.
//!
//! The core never talks to a chat network itself; the host process owns the
//! connection and hands an implementation of [`Transport`] to the delegator.

use crate::{
    error::BoxError,
    message::{ChatId, ChatMessage, MessageRef, User},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How the transport should interpret message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ParseMode {
    #[default]
    #[serde(rename = "HTML")]
    Html,
    Markdown,
    #[serde(rename = "MarkdownV2")]
    MarkdownV2,
}

/// A single inline keyboard button carrying opaque callback data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// Rows of inline buttons attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InlineKeyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

impl InlineKeyboard {
    /// A keyboard with a single row.
    pub fn row(buttons: Vec<InlineButton>) -> Self {
        Self {
            rows: vec![buttons],
        }
    }

    /// All buttons in row order.
    pub fn buttons(&self) -> impl Iterator<Item = &InlineButton> {
        self.rows.iter().flatten()
    }
}

/// Options for outbound sends and edits.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SendOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_mode: Option<ParseMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_markup: Option<InlineKeyboard>,
}

impl SendOptions {
    pub fn with_parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = Some(mode);
        self
    }

    pub fn with_keyboard(mut self, keyboard: InlineKeyboard) -> Self {
        self.reply_markup = Some(keyboard);
        self
    }
}

/// Outbound half of the chat connection.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Sends a new message and returns it as the transport recorded it.
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        options: SendOptions,
    ) -> Result<ChatMessage, BoxError>;

    /// Replaces the text (and keyboard) of an existing message.
    async fn edit_message_text(
        &self,
        target: MessageRef,
        text: &str,
        options: SendOptions,
    ) -> Result<(), BoxError>;

    /// Returns the bot's own account.
    async fn get_me(&self) -> Result<User, BoxError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        options: SendOptions,
    ) -> Result<ChatMessage, BoxError> {
        (**self).send_message(chat_id, text, options).await
    }

    async fn edit_message_text(
        &self,
        target: MessageRef,
        text: &str,
        options: SendOptions,
    ) -> Result<(), BoxError> {
        (**self).edit_message_text(target, text, options).await
    }

    async fn get_me(&self) -> Result<User, BoxError> {
        (**self).get_me().await
    }
}

/// A transport handle bound to one chat.
///
/// Handlers receive one of these so they can answer without knowing which
/// chat they were dispatched for.
#[derive(Clone)]
pub struct ChatSender {
    transport: Arc<dyn Transport>,
    chat_id: ChatId,
}

impl ChatSender {
    pub fn new(transport: Arc<dyn Transport>, chat_id: ChatId) -> Self {
        Self { transport, chat_id }
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Sends plain text to the bound chat.
    pub async fn send_message(&self, text: &str) -> Result<ChatMessage, BoxError> {
        self.send(text, SendOptions::default()).await
    }

    /// Sends text with explicit options to the bound chat.
    pub async fn send(&self, text: &str, options: SendOptions) -> Result<ChatMessage, BoxError> {
        self.transport.send_message(self.chat_id, text, options).await
    }

    /// Edits a message previously sent to the bound chat.
    pub async fn edit(
        &self,
        message_id: i64,
        text: &str,
        options: SendOptions,
    ) -> Result<(), BoxError> {
        let target = MessageRef {
            chat_id: self.chat_id,
            message_id,
        };
        self.transport.edit_message_text(target, text, options).await
    }
}

impl std::fmt::Debug for ChatSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSender")
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}
