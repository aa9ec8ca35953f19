//! A live beard instance and its error containment.

use crate::{
    beard::{BeardDescriptor, DynBeard},
    context::BeardContext,
    dispatch::{self, Dispatched},
    paginator::Navigation,
};
use beard_core::{BeardError, CallbackQuery, ChatMessage, DispatchError, error_chain};
use std::sync::Arc;
use tracing::Instrument;

/// One beard bound to one chat.
///
/// Every failure of beard code that reaches this boundary is contained here:
/// the chat gets an apology, the beard's `on_error` hook runs, and the error
/// is returned to the delegator as [`BeardError::Handler`].
pub struct BeardInstance {
    descriptor: Arc<BeardDescriptor>,
    beard: Box<dyn DynBeard>,
    ctx: BeardContext,
    apology: String,
}

impl BeardInstance {
    /// Creates the beard for `ctx`'s chat.
    pub fn create(
        descriptor: Arc<BeardDescriptor>,
        mut ctx: BeardContext,
        apology: impl Into<String>,
    ) -> Result<Self, BeardError> {
        let beard = descriptor
            .create(&mut ctx)
            .map_err(|source| BeardError::Handler {
                beard: descriptor.name().to_owned(),
                chat_id: ctx.chat_id(),
                source,
            })?;
        let apology = descriptor
            .apology()
            .map(str::to_owned)
            .unwrap_or_else(|| apology.into());
        Ok(Self {
            descriptor,
            beard,
            ctx,
            apology,
        })
    }

    pub fn descriptor(&self) -> &BeardDescriptor {
        &self.descriptor
    }

    pub fn context(&self) -> &BeardContext {
        &self.ctx
    }

    /// Runs the beard's message hook, then routes the message.
    pub async fn handle_message(&mut self, msg: &ChatMessage) -> Result<Dispatched, BeardError> {
        let span = self.ctx.logger().span().clone();
        let outcome = async {
            self.beard
                .on_chat_message_dyn(&mut self.ctx, msg)
                .await
                .map_err(DispatchError::Handler)?;
            dispatch::route(
                &mut *self.beard,
                &mut self.ctx,
                self.descriptor.commands(),
                msg,
            )
            .await
        }
        .instrument(span)
        .await;

        match outcome {
            Ok(dispatched) => Ok(dispatched),
            Err(err) => Err(self.contain(err).await),
        }
    }

    /// Offers the query to pagination first, then to the beard.
    pub async fn handle_callback_query(
        &mut self,
        query: &CallbackQuery,
    ) -> Result<Navigation, BeardError> {
        let span = self.ctx.logger().span().clone();
        let outcome = async {
            let navigation = match self.ctx.paginator() {
                Some(paginator) => paginator.on_callback(query).await?,
                None => Navigation::Ignored,
            };
            if !navigation.is_navigation() {
                self.beard
                    .on_callback_query_dyn(&mut self.ctx, query)
                    .await
                    .map_err(DispatchError::Handler)?;
            }
            Ok::<_, BeardError>(navigation)
        }
        .instrument(span)
        .await;

        match outcome {
            Ok(navigation) => Ok(navigation),
            Err(BeardError::Dispatch(err)) => Err(self.contain(err).await),
            Err(err) => Err(self.contain(DispatchError::Handler(Box::new(err))).await),
        }
    }

    /// Apologizes, runs the error hook and wraps the failure.
    async fn contain(&mut self, err: DispatchError) -> BeardError {
        let chain = error_chain(&err);
        tracing::debug!(parent: self.ctx.logger().span(), error = %chain, "containing failure");

        if let Err(send_err) = self.ctx.send_message(&self.apology).await {
            tracing::warn!(
                parent: self.ctx.logger().span(),
                error = %send_err,
                "could not send apology"
            );
        }
        self.beard.on_error_dyn(&self.ctx, &err);
        if self.ctx.logger().is_forwarding() {
            self.ctx.logger().report(&chain).await;
        }

        BeardError::Handler {
            beard: self.descriptor.name().to_owned(),
            chat_id: self.ctx.chat_id(),
            source: Box::new(err),
        }
    }
}

impl std::fmt::Debug for BeardInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeardInstance")
            .field("beard", &self.descriptor.name())
            .field("ctx", &self.ctx)
            .finish_non_exhaustive()
    }
}
