//! Per-instance logging.

use beard_core::{ChatId, ChatSender};
use tracing::Span;

/// The logger owned by one beard instance.
///
/// Holds an `info` span carrying the beard name and chat id; everything the
/// instance does runs inside it. When forwarding is enabled, [`report`]
/// additionally sends the line to the instance's chat. Only lines passed to
/// [`report`] are forwarded, contained failures among them; plain `tracing`
/// events emitted inside the span stay in the subscriber.
///
/// The span is closed when the logger is dropped, which happens exactly when
/// the instance is torn down.
///
/// [`report`]: InstanceLogger::report
pub struct InstanceLogger {
    span: Span,
    forward: Option<ChatSender>,
}

impl InstanceLogger {
    pub fn new(beard: &str, chat_id: ChatId, forward: Option<ChatSender>) -> Self {
        let span = tracing::info_span!("beard", beard = %beard, chat_id = chat_id);
        span.in_scope(|| tracing::debug!(forwarding = forward.is_some(), "instance started"));
        Self { span, forward }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn is_forwarding(&self) -> bool {
        self.forward.is_some()
    }

    /// Logs `line` at info level and forwards it to the chat if enabled.
    ///
    /// Forwarding failures are logged and otherwise ignored.
    pub async fn report(&self, line: &str) {
        self.span.in_scope(|| tracing::info!("{line}"));
        let Some(sender) = &self.forward else {
            return;
        };
        if let Err(err) = sender.send_message(line).await {
            self.span
                .in_scope(|| tracing::warn!(error = %err, "could not forward log line"));
        }
    }
}

impl Drop for InstanceLogger {
    fn drop(&mut self) {
        self.span.in_scope(|| tracing::debug!("instance torn down"));
    }
}

impl std::fmt::Debug for InstanceLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceLogger")
            .field("span", &self.span)
            .field("forwarding", &self.forward.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beard_std::testing::MockTransport;
    use std::sync::Arc;

    #[tokio::test]
    async fn report_forwards_only_when_enabled() {
        let transport = Arc::new(MockTransport::new());

        let quiet = InstanceLogger::new("Echo", 1, None);
        quiet.report("hello").await;
        assert!(transport.sent().is_empty());
        assert!(!quiet.is_forwarding());

        let loud = InstanceLogger::new("Echo", 1, Some(ChatSender::new(transport.clone(), 1)));
        loud.report("hello").await;
        assert_eq!(transport.sent_to(1), vec!["hello"]);

        transport.set_fail_sends(true);
        loud.report("lost").await;
        assert_eq!(transport.sent().len(), 1);
    }
}
