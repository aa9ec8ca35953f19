//! Per-instance state handed to beard code.

use crate::{formatter::FormatterRegistry, logger::InstanceLogger, paginator::Paginator};
use beard_core::{
    BeardUid, BotIdentity, BoxError, ChatId, ChatMessage, ChatSender, CodecError, OwnershipCodec,
    ParseMode, PredicateContext, Table, Transport,
};
use beard_std::command::Command;
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;

/// Everything a beard instance knows about where it runs.
///
/// One context exists per `(beard, chat)` instance and lives exactly as long
/// as the instance. Beard methods receive it mutably so they can register
/// instance commands.
pub struct BeardContext {
    beard: &'static str,
    chat_id: ChatId,
    sender: ChatSender,
    codec: OwnershipCodec,
    identity: Arc<BotIdentity>,
    commands: Vec<Command>,
    logger: InstanceLogger,
    paginator: Option<Paginator>,
    key: Option<Arc<str>>,
}

impl BeardContext {
    pub fn builder(
        beard: &'static str,
        chat_id: ChatId,
        transport: Arc<dyn Transport>,
        identity: Arc<BotIdentity>,
    ) -> BeardContextBuilder {
        BeardContextBuilder {
            beard,
            chat_id,
            transport,
            identity,
            forward_logs: false,
            pagination: None,
            key: None,
        }
    }

    /// Name of the beard this instance belongs to.
    pub fn beard(&self) -> &'static str {
        self.beard
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    pub fn sender(&self) -> &ChatSender {
        &self.sender
    }

    /// Sends plain text to this instance's chat.
    pub async fn send_message(&self, text: &str) -> Result<ChatMessage, BoxError> {
        self.sender.send_message(text).await
    }

    pub fn uid(&self) -> &BeardUid {
        self.codec.uid()
    }

    pub fn codec(&self) -> &OwnershipCodec {
        &self.codec
    }

    /// Tags `payload` as owned by this instance, for use as callback data.
    pub fn serialize<T: Serialize + ?Sized>(&self, payload: &T) -> Result<String, CodecError> {
        self.codec.encode(payload)
    }

    /// Reads back a token produced by [`serialize`](Self::serialize).
    ///
    /// Tokens from other instances fail with [`CodecError::NotMine`], which
    /// callers normally ignore.
    pub fn deserialize<T: DeserializeOwned>(&self, token: &str) -> Result<T, CodecError> {
        self.codec.decode(token)
    }

    pub fn identity(&self) -> &BotIdentity {
        &self.identity
    }

    /// Adds a command evaluated before the beard's declared commands.
    ///
    /// Instance commands are kept in registration order and live until the
    /// instance is torn down.
    pub fn register_command(&mut self, command: Command) {
        tracing::debug!(
            parent: self.logger.span(),
            command = %command.label(),
            "registered instance command"
        );
        self.commands.push(command);
    }

    pub fn instance_commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn logger(&self) -> &InstanceLogger {
        &self.logger
    }

    /// Pagination, for beards that declare it.
    pub fn paginator(&self) -> Option<&Paginator> {
        self.paginator.as_ref()
    }

    /// The configured bot key, if any.
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub(crate) fn predicate_context(&self) -> PredicateContext<'_> {
        PredicateContext {
            beard: self.beard,
            chat_id: self.chat_id,
            identity: &self.identity,
        }
    }
}

impl std::fmt::Debug for BeardContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeardContext")
            .field("uid", self.codec.uid())
            .field("instance_commands", &self.commands.len())
            .field("paginated", &self.paginator.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`BeardContext`].
pub struct BeardContextBuilder {
    beard: &'static str,
    chat_id: ChatId,
    transport: Arc<dyn Transport>,
    identity: Arc<BotIdentity>,
    forward_logs: bool,
    pagination: Option<(Arc<dyn Table>, Arc<FormatterRegistry>, ParseMode)>,
    key: Option<Arc<str>>,
}

impl BeardContextBuilder {
    /// Also send instance log lines to the chat.
    pub fn forward_logs(mut self, forward: bool) -> Self {
        self.forward_logs = forward;
        self
    }

    /// Enables pagination backed by `table`.
    pub fn pagination(
        mut self,
        table: Arc<dyn Table>,
        formatters: Arc<FormatterRegistry>,
        parse_mode: ParseMode,
    ) -> Self {
        self.pagination = Some((table, formatters, parse_mode));
        self
    }

    pub fn key(mut self, key: Option<Arc<str>>) -> Self {
        self.key = key;
        self
    }

    pub fn build(self) -> BeardContext {
        let sender = ChatSender::new(self.transport, self.chat_id);
        let codec = OwnershipCodec::for_instance(self.beard, self.chat_id);
        let logger = InstanceLogger::new(
            self.beard,
            self.chat_id,
            self.forward_logs.then(|| sender.clone()),
        );
        let paginator = self.pagination.map(|(table, formatters, parse_mode)| {
            Paginator::new(codec.clone(), sender.clone(), table, formatters, parse_mode)
        });
        BeardContext {
            beard: self.beard,
            chat_id: self.chat_id,
            sender,
            codec,
            identity: self.identity,
            commands: Vec::new(),
            logger,
            paginator,
            key: self.key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beard_core::{Handler, Predicate, TableStore};
    use beard_std::{storage::MemoryStore, testing::MockTransport};

    fn context(beard: &'static str, chat_id: ChatId) -> BeardContext {
        let transport: Arc<dyn Transport> = Arc::new(MockTransport::new());
        let identity = Arc::new(BotIdentity::new(transport.clone()));
        BeardContext::builder(beard, chat_id, transport, identity).build()
    }

    #[test]
    fn serialize_is_scoped_to_the_instance() {
        let search = context("Search", 1);
        let token = search.serialize(&("page", 2)).unwrap();
        let back: (String, u32) = search.deserialize(&token).unwrap();
        assert_eq!(back, ("page".to_owned(), 2));

        assert!(context("Search", 2).deserialize::<(String, u32)>(&token).unwrap_err().is_not_mine());
        assert!(context("Echo", 1).deserialize::<(String, u32)>(&token).unwrap_err().is_not_mine());
        assert_eq!(search.uid().as_str(), "Search:1");
    }

    #[test]
    fn instance_commands_keep_registration_order() {
        let mut ctx = context("Echo", 1);
        ctx.register_command(Command::new(Predicate::always(), "first"));
        ctx.register_command(Command::new(Predicate::always(), Handler::sync(|_, _| Ok(()))));
        let labels: Vec<_> = ctx
            .instance_commands()
            .iter()
            .map(|c| c.label().into_owned())
            .collect();
        assert_eq!(labels, ["first", "<filter>"]);
    }

    #[test]
    fn builder_wires_optional_parts() {
        let transport: Arc<dyn Transport> = Arc::new(MockTransport::new());
        let identity = Arc::new(BotIdentity::new(transport.clone()));
        let store = MemoryStore::new();
        let ctx = BeardContext::builder("Search", 3, transport, identity)
            .forward_logs(true)
            .pagination(
                store.table("Search", "_paginator"),
                Arc::new(FormatterRegistry::new()),
                ParseMode::Html,
            )
            .key(Some("secret".into()))
            .build();
        assert!(ctx.paginator().is_some());
        assert!(ctx.logger().is_forwarding());
        assert_eq!(ctx.key(), Some("secret"));
        assert_eq!(ctx.sender().chat_id(), 3);
    }
}
