//! Persistent pagination.
//!
//! A paginated message shows one item at a time with "« prev" / "next »"
//! buttons. The state behind the buttons, a [`Window`] over the items, is
//! stored in the beard's `_paginator` table keyed by the chat and id of the
//! message it annotates, so navigation keeps working for as long as the table
//! holds the row, across instance teardowns. Every chat of a beard shares the
//! table and message ids are only unique within a chat, so both fields are
//! always part of the key.
//!
//! Button payloads are ownership-tagged, so a beard only ever navigates its
//! own messages even though every beard in the chat sees every button press.
//!
//! Concurrent presses on the same message are last-writer-wins: each press
//! reads the stored window, steps it and writes it back without any
//! versioning. Presses delivered through one instance are serialized by the
//! delegator, which covers the common case of a single delegator process.

use crate::formatter::FormatterRegistry;
use beard_core::{
    CallbackQuery, ChatMessage, ChatSender, InlineButton, InlineKeyboard, MessageId, MessageRef,
    OwnershipCodec, PaginationError, ParseMode, Record, SendOptions, Table,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Purpose suffix of the table holding pagination windows.
pub const PAGINATOR_TABLE: &str = "_paginator";

const PREV_LABEL: &str = "« prev";
const NEXT_LABEL: &str = "next »";
const CHAT_KEY: &str = "chat_id";
const MESSAGE_KEY: &str = "message_id";
const KEYS: [&str; 2] = [CHAT_KEY, MESSAGE_KEY];

/// Which way a navigation button moves the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "p")]
    Prev,
    #[serde(rename = "n")]
    Next,
}

impl Direction {
    /// The payload carried by this direction's button.
    pub fn token(self) -> &'static str {
        match self {
            Direction::Prev => "p",
            Direction::Next => "n",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "p" => Some(Direction::Prev),
            "n" => Some(Direction::Next),
            _ => None,
        }
    }
}

/// The visible position in a paginated sequence.
///
/// `prev` holds the items before `curr` in order, `next` the items after it.
/// `formatter` names the [`FormatterRegistry`] entry that renders `curr`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub prev: Vec<Value>,
    pub curr: Value,
    pub next: Vec<Value>,
    pub formatter: String,
}

impl Window {
    /// Opens a window.
    ///
    /// Without an explicit `curr`, the head of `next` becomes current.
    pub fn open(
        mut next: Vec<Value>,
        formatter: impl Into<String>,
        curr: Option<Value>,
        prev: Vec<Value>,
    ) -> Result<Self, PaginationError> {
        let curr = match curr {
            Some(curr) => curr,
            None if next.is_empty() => return Err(PaginationError::Empty),
            None => next.remove(0),
        };
        Ok(Self {
            prev,
            curr,
            next,
            formatter: formatter.into(),
        })
    }

    pub fn has_prev(&self) -> bool {
        !self.prev.is_empty()
    }

    pub fn has_next(&self) -> bool {
        !self.next.is_empty()
    }

    /// The window after moving one item in `direction`, or `None` at either end.
    pub fn step(&self, direction: Direction) -> Option<Window> {
        let mut moved = self.clone();
        match direction {
            Direction::Prev => {
                let curr = moved.prev.pop()?;
                let old = std::mem::replace(&mut moved.curr, curr);
                moved.next.insert(0, old);
            }
            Direction::Next => {
                if moved.next.is_empty() {
                    return None;
                }
                let curr = moved.next.remove(0);
                let old = std::mem::replace(&mut moved.curr, curr);
                moved.prev.push(old);
            }
        }
        Some(moved)
    }

    fn into_record(self, target: MessageRef) -> Record {
        let mut record = key_of(target);
        record.insert("prev".to_owned(), Value::Array(self.prev));
        record.insert("curr".to_owned(), self.curr);
        record.insert("next".to_owned(), Value::Array(self.next));
        record.insert("formatter".to_owned(), Value::String(self.formatter));
        record
    }

    fn from_record(record: Record) -> Result<Self, PaginationError> {
        serde_json::from_value(Value::Object(record)).map_err(PaginationError::CorruptWindow)
    }
}

/// What a callback query did to pagination state.
#[derive(Debug, Clone, PartialEq)]
pub enum Navigation {
    /// The button belongs to another instance.
    NotMine,
    /// Our token, but not a navigation button (or no payload at all).
    Ignored,
    /// No stored window for the pressed message.
    Missing,
    /// Already at the end in that direction; nothing changed.
    OutOfRange(Direction),
    /// The window moved and the message was edited.
    Moved { direction: Direction, window: Window },
}

impl Navigation {
    /// True when the query carried one of our navigation buttons.
    pub fn is_navigation(&self) -> bool {
        matches!(
            self,
            Navigation::Missing | Navigation::OutOfRange(_) | Navigation::Moved { .. }
        )
    }
}

/// Pagination for one beard instance.
pub struct Paginator {
    codec: OwnershipCodec,
    sender: ChatSender,
    table: Arc<dyn Table>,
    formatters: Arc<FormatterRegistry>,
    parse_mode: ParseMode,
}

impl Paginator {
    pub fn new(
        codec: OwnershipCodec,
        sender: ChatSender,
        table: Arc<dyn Table>,
        formatters: Arc<FormatterRegistry>,
        parse_mode: ParseMode,
    ) -> Self {
        Self {
            codec,
            sender,
            table,
            formatters,
            parse_mode,
        }
    }

    /// Sends `items` one at a time, starting at the first.
    pub async fn send_paginated_message<T: Serialize>(
        &self,
        items: impl IntoIterator<Item = T>,
        formatter: &str,
    ) -> Result<ChatMessage, PaginationError> {
        self.open(items, formatter, None, Vec::new()).await
    }

    /// Sends a paginated message positioned at `curr`.
    ///
    /// Fails before sending anything if `formatter` is not registered or
    /// there is no item to show.
    pub async fn open<T: Serialize>(
        &self,
        next: impl IntoIterator<Item = T>,
        formatter: &str,
        curr: Option<T>,
        prev: impl IntoIterator<Item = T>,
    ) -> Result<ChatMessage, PaginationError> {
        if !self.formatters.contains(formatter) {
            return Err(PaginationError::UnknownFormatter(formatter.to_owned()));
        }
        let window = Window::open(
            to_values(next)?,
            formatter,
            curr.map(serde_json::to_value)
                .transpose()
                .map_err(PaginationError::Item)?,
            to_values(prev)?,
        )?;

        let text = self.render(&window).await?;
        let sent = self
            .sender
            .send(&text, self.options(&window)?)
            .await
            .map_err(PaginationError::Transport)?;

        self.table
            .insert(window.into_record(sent.reference()))
            .await
            .map_err(PaginationError::Storage)?;
        tracing::debug!(message_id = sent.message_id, "opened pagination window");
        Ok(sent)
    }

    /// Reacts to a button press.
    pub async fn on_callback(&self, query: &CallbackQuery) -> Result<Navigation, PaginationError> {
        let Some(data) = query.data.as_deref() else {
            return Ok(Navigation::Ignored);
        };
        let payload: Value = match self.codec.decode(data) {
            Ok(payload) => payload,
            Err(err) if err.is_not_mine() => return Ok(Navigation::NotMine),
            Err(err) => return Err(err.into()),
        };
        let Some(direction) = payload.as_str().and_then(Direction::from_token) else {
            return Ok(Navigation::Ignored);
        };
        let Some(message) = &query.message else {
            tracing::debug!(query = %query.id, "navigation without a message");
            return Ok(Navigation::Missing);
        };
        let target = MessageRef {
            chat_id: self.sender.chat_id(),
            message_id: message.message_id,
        };

        let Some(window) = self.window(target.message_id).await? else {
            tracing::warn!(message_id = target.message_id, "no pagination window stored");
            return Ok(Navigation::Missing);
        };
        let Some(moved) = window.step(direction) else {
            tracing::debug!(message_id = target.message_id, ?direction, "already at the end");
            return Ok(Navigation::OutOfRange(direction));
        };

        let replaced = self
            .table
            .update(moved.clone().into_record(target), &KEYS)
            .await
            .map_err(PaginationError::Storage)?;
        if !replaced {
            tracing::warn!(message_id = target.message_id, "pagination window vanished");
        }
        self.edit(target, &moved).await?;
        Ok(Navigation::Moved {
            direction,
            window: moved,
        })
    }

    /// The stored window for `message_id` in this instance's chat.
    pub async fn window(&self, message_id: MessageId) -> Result<Option<Window>, PaginationError> {
        let filter = key_of(MessageRef {
            chat_id: self.sender.chat_id(),
            message_id,
        });
        self.table
            .find_one(&filter)
            .await
            .map_err(PaginationError::Storage)?
            .map(Window::from_record)
            .transpose()
    }

    /// Navigation buttons for `window`, or `None` when there is nowhere to go.
    pub fn keyboard(&self, window: &Window) -> Result<Option<InlineKeyboard>, PaginationError> {
        let mut row = Vec::with_capacity(2);
        if window.has_prev() {
            row.push(InlineButton::new(
                PREV_LABEL,
                self.codec.encode(Direction::Prev.token())?,
            ));
        }
        if window.has_next() {
            row.push(InlineButton::new(
                NEXT_LABEL,
                self.codec.encode(Direction::Next.token())?,
            ));
        }
        Ok((!row.is_empty()).then(|| InlineKeyboard::row(row)))
    }

    async fn render(&self, window: &Window) -> Result<String, PaginationError> {
        let formatter = self
            .formatters
            .get(&window.formatter)
            .ok_or_else(|| PaginationError::UnknownFormatter(window.formatter.clone()))?;
        formatter(window.curr.clone())
            .await
            .map_err(|source| PaginationError::Formatter {
                name: window.formatter.clone(),
                source,
            })
    }

    fn options(&self, window: &Window) -> Result<SendOptions, PaginationError> {
        let options = SendOptions::default().with_parse_mode(self.parse_mode);
        Ok(match self.keyboard(window)? {
            Some(keyboard) => options.with_keyboard(keyboard),
            None => options,
        })
    }

    async fn edit(&self, target: MessageRef, window: &Window) -> Result<(), PaginationError> {
        let text = self.render(window).await?;
        self.sender
            .transport()
            .edit_message_text(target, &text, self.options(window)?)
            .await
            .map_err(PaginationError::Transport)
    }
}

impl std::fmt::Debug for Paginator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Paginator")
            .field("uid", self.codec.uid())
            .field("parse_mode", &self.parse_mode)
            .finish_non_exhaustive()
    }
}

fn key_of(target: MessageRef) -> Record {
    let mut record = Record::new();
    record.insert(CHAT_KEY.to_owned(), Value::from(target.chat_id));
    record.insert(MESSAGE_KEY.to_owned(), Value::from(target.message_id));
    record
}

fn to_values<T: Serialize>(items: impl IntoIterator<Item = T>) -> Result<Vec<Value>, PaginationError> {
    items
        .into_iter()
        .map(|item| serde_json::to_value(item).map_err(PaginationError::Item))
        .collect()
}
