//! Ownership-tagged payloads.
//!
//! Every beard instance shares the same callback channel with every other
//! beard in the same chat. To tell its own callbacks apart, an instance tags
//! each payload with its uid before handing it to the transport, and refuses
//! to decode payloads carrying any other uid.
//!
//! Tokens are JSON arrays `[uid, payload]`.

use crate::{error::CodecError, message::ChatId};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::fmt;

/// Identifies one beard instance: a beard name paired with a chat.
///
/// Rendered as `"<beard>:<chat_id>"`. Beard names never contain `:`, so
/// distinct pairs always render distinctly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BeardUid(String);

impl BeardUid {
    pub fn new(beard: &str, chat_id: ChatId) -> Self {
        Self(format!("{beard}:{chat_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BeardUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encodes and decodes payloads owned by one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipCodec {
    uid: BeardUid,
}

impl OwnershipCodec {
    pub fn new(uid: BeardUid) -> Self {
        Self { uid }
    }

    pub fn for_instance(beard: &str, chat_id: ChatId) -> Self {
        Self::new(BeardUid::new(beard, chat_id))
    }

    pub fn uid(&self) -> &BeardUid {
        &self.uid
    }

    /// Tags `payload` with this instance's uid.
    pub fn encode<T: Serialize + ?Sized>(&self, payload: &T) -> Result<String, CodecError> {
        serde_json::to_string(&(self.uid.as_str(), payload)).map_err(CodecError::Encode)
    }

    /// Untags a token produced by [`encode`](Self::encode) on the same instance.
    ///
    /// The owner is checked before the payload is interpreted, so a foreign
    /// token always fails with [`CodecError::NotMine`] even when its payload
    /// would not parse as `T`.
    pub fn decode<T: DeserializeOwned>(&self, token: &str) -> Result<T, CodecError> {
        let (owner, payload): (String, Value) = serde_json::from_str(token)?;
        if owner != self.uid.as_str() {
            return Err(CodecError::NotMine {
                expected: self.uid.to_string(),
                found: owner,
            });
        }
        Ok(serde_json::from_value(payload)?)
    }
}
