//! Inbound message model.
//!
//! These are the shapes the transport collaborator delivers. Only the fields
//! the dispatch core reads are modelled; everything else the transport knows
//! about a message stays on its side of the boundary.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Identifier of a chat as assigned by the transport.
pub type ChatId = i64;

/// Identifier of a message inside a chat.
pub type MessageId = i64;

/// A user (or the bot itself, as returned by `get_me`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
}

/// The chat a message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
}

/// A document attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub file_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// A shared location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

bitflags! {
    /// The kinds of content a message carries.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ContentKind: u8 {
        const TEXT = 1;
        const DOCUMENT = 1 << 1;
        const LOCATION = 1 << 2;
    }
}

/// A chat message as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub message_id: MessageId,
    pub chat: Chat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<Document>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl ChatMessage {
    /// A bare message with no content, useful as a starting point.
    pub fn new(chat_id: ChatId, message_id: MessageId) -> Self {
        Self {
            message_id,
            chat: Chat { id: chat_id },
            from: None,
            text: None,
            document: None,
            location: None,
        }
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat.id
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// The content kinds present on this message.
    pub fn content(&self) -> ContentKind {
        let mut kind = ContentKind::empty();
        kind.set(ContentKind::TEXT, self.text.is_some());
        kind.set(ContentKind::DOCUMENT, self.document.is_some());
        kind.set(ContentKind::LOCATION, self.location.is_some());
        kind
    }

    /// A reference to this message for in-place edits.
    pub fn reference(&self) -> MessageRef {
        MessageRef {
            chat_id: self.chat.id,
            message_id: self.message_id,
        }
    }
}

/// Addresses one message for edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// A press on an inline keyboard button.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    /// Opaque data attached to the pressed button.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// The message the keyboard was attached to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<ChatMessage>,
}

impl CallbackQuery {
    /// The chat of the originating message, if the transport supplied it.
    pub fn chat_id(&self) -> Option<ChatId> {
        self.message.as_ref().map(ChatMessage::chat_id)
    }
}

/// Anything the transport delivers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Update {
    Message(ChatMessage),
    CallbackQuery(CallbackQuery),
}

impl Update {
    /// The chat this update concerns, when known.
    pub fn chat_id(&self) -> Option<ChatId> {
        match self {
            Update::Message(msg) => Some(msg.chat_id()),
            Update::CallbackQuery(query) => query.chat_id(),
        }
    }
}
