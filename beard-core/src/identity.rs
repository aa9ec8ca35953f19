//! The bot's own identity, resolved once.

use crate::{error::BoxError, message::User, transport::Transport};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Error returned when the bot account has no username.
#[derive(Debug, thiserror::Error)]
#[error("bot account {0} has no username")]
pub struct MissingUsername(pub i64);

/// Memoized `get_me` for one bot.
///
/// The first caller performs the lookup; callers arriving while it is in
/// flight wait for the same result instead of issuing their own. A failed
/// lookup leaves the cell empty so a later caller retries.
pub struct BotIdentity {
    transport: Arc<dyn Transport>,
    me: OnceCell<User>,
}

impl BotIdentity {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            me: OnceCell::new(),
        }
    }

    /// An identity that is already resolved and never calls the transport.
    pub fn resolved(transport: Arc<dyn Transport>, me: User) -> Self {
        Self {
            transport,
            me: OnceCell::new_with(Some(me)),
        }
    }

    /// The bot's account, resolving it on first use.
    pub async fn me(&self) -> Result<&User, BoxError> {
        self.me
            .get_or_try_init(|| async {
                let me = self.transport.get_me().await?;
                tracing::debug!(bot_id = me.id, username = ?me.username, "resolved bot identity");
                Ok::<_, BoxError>(me)
            })
            .await
    }

    /// The bot's username, resolving it on first use.
    pub async fn username(&self) -> Result<&str, BoxError> {
        let me = self.me().await?;
        me.username
            .as_deref()
            .ok_or_else(|| Box::new(MissingUsername(me.id)) as BoxError)
    }

    /// The username if it has already been resolved.
    pub fn cached_username(&self) -> Option<&str> {
        self.me.get().and_then(|me| me.username.as_deref())
    }
}

impl std::fmt::Debug for BotIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotIdentity")
            .field("me", &self.me.get())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        message::{ChatId, ChatMessage, MessageRef},
        transport::SendOptions,
    };
    use async_trait::async_trait;
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    struct SlowMe {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transport for SlowMe {
        async fn send_message(
            &self,
            chat_id: ChatId,
            _text: &str,
            _options: SendOptions,
        ) -> Result<ChatMessage, BoxError> {
            Ok(ChatMessage::new(chat_id, 1))
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
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(User {
                id: 1,
                username: Some("thisbot".into()),
                first_name: None,
            })
        }
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_lookup() {
        let transport = Arc::new(SlowMe {
            calls: AtomicUsize::new(0),
        });
        let identity = BotIdentity::new(transport.clone());

        let (a, b, c) = tokio::join!(identity.username(), identity.username(), identity.username());
        assert_eq!(a.unwrap(), "thisbot");
        assert_eq!(b.unwrap(), "thisbot");
        assert_eq!(c.unwrap(), "thisbot");
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);

        identity.username().await.unwrap();
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert_eq!(identity.cached_username(), Some("thisbot"));
    }

    #[tokio::test]
    async fn resolved_identity_skips_transport() {
        let transport = Arc::new(SlowMe {
            calls: AtomicUsize::new(0),
        });
        let identity = BotIdentity::resolved(
            transport.clone(),
            User {
                id: 2,
                username: None,
                first_name: None,
            },
        );
        assert!(identity.username().await.is_err());
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }
}
