//! Error types for beard.
//!
//! The hierarchy follows the failure taxonomy of the dispatch core:
//!
//! - [`BeardError`] - Top-level error type returned at instance boundaries
//! - [`CodecError`] - Ownership-tagged payload decoding failures
//! - [`DispatchError`] - Command routing failures
//! - [`PaginationError`] - Pagination window failures
//!
//! Missing message fields are never errors; predicates report them as "no
//! match". Collaborator failures travel as [`BoxError`] sources.

use thiserror::Error;

/// A boxed error type for collaborator and user handler failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum BeardError {
    /// A matched handler (or an override hook) failed.
    #[error("handler failed in {beard} for chat {chat_id}")]
    Handler {
        beard: String,
        chat_id: i64,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Pagination(#[from] PaginationError),

    #[error("transport error")]
    Transport(#[source] BoxError),

    #[error("storage error")]
    Storage(#[source] BoxError),
}

/// Decoding an ownership-tagged token failed.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The token was produced by another beard or for another chat.
    ///
    /// Callers are expected to ignore this silently: several beards share one
    /// callback channel and each sees the others' tokens.
    #[error("token belongs to {found}, not {expected}")]
    NotMine { expected: String, found: String },

    /// The token is not a tagged payload at all.
    #[error("malformed token")]
    Malformed(#[from] serde_json::Error),

    /// The payload could not be encoded.
    #[error("payload could not be encoded")]
    Encode(#[source] serde_json::Error),
}

impl CodecError {
    pub fn is_not_mine(&self) -> bool {
        matches!(self, CodecError::NotMine { .. })
    }
}

/// Errors raised while routing a message to a command.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// A command names a method the beard does not provide.
    #[error("beard {beard} has no method named {method}")]
    UnknownMethod { beard: String, method: String },

    /// The handler itself failed.
    #[error("handler failed")]
    Handler(#[source] BoxError),
}

/// Errors raised by the pagination component.
#[derive(Error, Debug)]
pub enum PaginationError {
    /// Neither a current item nor any next item was supplied.
    #[error("nothing to paginate")]
    Empty,

    /// The window references a formatter that was never registered.
    #[error("no formatter registered as {0}")]
    UnknownFormatter(String),

    /// A stored window could not be read back.
    #[error("stored window is corrupt")]
    CorruptWindow(#[source] serde_json::Error),

    /// An item could not be converted to or from its stored form.
    #[error("item could not be stored")]
    Item(#[source] serde_json::Error),

    /// A navigation token could not be produced or read.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The formatter failed.
    #[error("formatter {name} failed")]
    Formatter {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("pagination storage error")]
    Storage(#[source] BoxError),

    #[error("pagination transport error")]
    Transport(#[source] BoxError),
}

impl From<BoxError> for DispatchError {
    fn from(err: BoxError) -> Self {
        DispatchError::Handler(err)
    }
}

/// Renders an error followed by its `source` chain, one cause per line.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str("\n  caused by: ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_mine_is_distinguishable_from_malformed() {
        let not_mine = CodecError::NotMine {
            expected: "a:1".into(),
            found: "b:1".into(),
        };
        assert!(not_mine.is_not_mine());

        let malformed: CodecError = serde_json::from_str::<u8>("{").unwrap_err().into();
        assert!(!malformed.is_not_mine());
    }

    #[test]
    fn chain_lists_every_cause() {
        let err = BeardError::Handler {
            beard: "Echo".into(),
            chat_id: 3,
            source: Box::new(DispatchError::UnknownMethod {
                beard: "Echo".into(),
                method: "missing".into(),
            }),
        };
        let chain = error_chain(&err);
        assert!(chain.starts_with("handler failed in Echo for chat 3"));
        assert!(chain.contains("caused by: beard Echo has no method named missing"));
    }
}
