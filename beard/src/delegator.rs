//! # Delegator
//!
//! The host-facing entry point. The host feeds every inbound update to
//! [`Delegator::handle_update`]; the delegator fans it out to one instance
//! per registered beard for the update's chat, creating instances on demand.
//!
//! # Lifecycle
//!
//! - An instance is created on the first event for its `(beard, chat)` pair.
//! - Events for one instance are delivered one at a time; events for
//!   different instances run concurrently.
//! - Each delivery pushes the instance's idle deadline forward. Instances
//!   past their deadline are dropped by [`Delegator::reap_idle`], typically
//!   driven by [`Delegator::spawn_reaper`], and recreated on the next event.
//!
//! A failure in one instance is logged and never stops delivery to others.

use crate::{
    beard::{BeardDescriptor, BeardSetup},
    config::Config,
    context::BeardContext,
    formatter::FormatterRegistry,
    instance::BeardInstance,
    paginator::PAGINATOR_TABLE,
    registry::{Registry, RegistryError},
};
use beard_core::{
    BeardError, BotIdentity, CallbackQuery, ChatId, ChatMessage, TableStore, Transport, Update,
    error_chain,
};
use beard_std::storage::MemoryStore;
use futures::future::join_all;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use tokio::{
    sync::OwnedMutexGuard,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};

type InstanceKey = (&'static str, ChatId);

/// Counts of what happened to one update.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Instances that processed the update without failing.
    pub delivered: usize,
    /// Of those, instances where a command ran or a navigation button was ours.
    pub handled: usize,
    /// Instances that failed.
    pub failed: usize,
}

impl DeliveryReport {
    fn record(&mut self, beard: &str, chat_id: ChatId, outcome: Result<bool, BeardError>) {
        match outcome {
            Ok(handled) => {
                self.delivered += 1;
                self.handled += usize::from(handled);
            }
            Err(err) => {
                self.failed += 1;
                tracing::error!(beard, chat_id, error = %error_chain(&err), "delivery failed");
            }
        }
    }
}

struct Slot {
    instance: Arc<tokio::sync::Mutex<BeardInstance>>,
    timeout: Duration,
    deadline: Mutex<Instant>,
}

impl Slot {
    fn new(instance: BeardInstance, timeout: Duration) -> Self {
        Self {
            instance: Arc::new(tokio::sync::Mutex::new(instance)),
            timeout,
            deadline: Mutex::new(Instant::now() + timeout),
        }
    }

    fn touch(&self) {
        *self.deadline.lock().unwrap_or_else(PoisonError::into_inner) =
            Instant::now() + self.timeout;
    }

    fn is_idle(&self, now: Instant) -> bool {
        *self.deadline.lock().unwrap_or_else(PoisonError::into_inner) <= now
            && self.instance.try_lock().is_ok()
    }
}

/// Routes updates to per-chat beard instances.
pub struct Delegator {
    registry: Arc<Registry>,
    transport: Arc<dyn Transport>,
    store: Arc<dyn TableStore>,
    identity: Arc<BotIdentity>,
    formatters: Arc<FormatterRegistry>,
    config: Arc<Config>,
    key: Option<Arc<str>>,
    instances: Mutex<HashMap<InstanceKey, Arc<Slot>>>,
}

impl Delegator {
    pub fn builder(registry: Registry, transport: Arc<dyn Transport>) -> DelegatorBuilder {
        DelegatorBuilder {
            registry,
            transport,
            store: None,
            formatters: None,
            config: Config::default(),
        }
    }

    /// Builds a delegator with a fresh formatter registry.
    pub fn new(
        registry: Registry,
        transport: Arc<dyn Transport>,
        store: Arc<dyn TableStore>,
        config: Config,
    ) -> Result<Self, RegistryError> {
        Self::builder(registry, transport)
            .store(store)
            .config(config)
            .build()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn formatters(&self) -> &Arc<FormatterRegistry> {
        &self.formatters
    }

    pub fn identity(&self) -> &Arc<BotIdentity> {
        &self.identity
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Delivers any update.
    pub async fn handle_update(&self, update: &Update) -> DeliveryReport {
        match update {
            Update::Message(msg) => self.handle_message(msg).await,
            Update::CallbackQuery(query) => self.handle_callback_query(query).await,
        }
    }

    /// Delivers a message to every beard's instance for its chat.
    pub async fn handle_message(&self, msg: &ChatMessage) -> DeliveryReport {
        let chat_id = msg.chat_id();
        let deliveries = self.registry.iter().map(|descriptor| async move {
            (descriptor.name(), self.deliver_message(descriptor, msg).await)
        });

        let mut report = DeliveryReport::default();
        for (beard, outcome) in join_all(deliveries).await {
            report.record(beard, chat_id, outcome);
        }
        report
    }

    /// Delivers a button press to every beard's instance for its chat.
    ///
    /// Ownership tags make every instance but the owner ignore it.
    pub async fn handle_callback_query(&self, query: &CallbackQuery) -> DeliveryReport {
        let Some(chat_id) = query.chat_id() else {
            tracing::debug!(query = %query.id, "callback query without a chat");
            return DeliveryReport::default();
        };
        let deliveries = self.registry.iter().map(|descriptor| async move {
            let outcome = self.deliver_callback_query(descriptor, chat_id, query).await;
            (descriptor.name(), outcome)
        });

        let mut report = DeliveryReport::default();
        for (beard, outcome) in join_all(deliveries).await {
            report.record(beard, chat_id, outcome);
        }
        report
    }

    /// Drops every instance past its idle deadline that is not busy.
    ///
    /// Returns how many were torn down.
    pub fn reap_idle(&self) -> usize {
        let now = Instant::now();
        let reaped: Vec<_> = {
            let mut instances = self
                .instances
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let idle: Vec<InstanceKey> = instances
                .iter()
                .filter(|(_, slot)| slot.is_idle(now))
                .map(|(key, _)| *key)
                .collect();
            idle.into_iter()
                .filter_map(|key| instances.remove(&key).map(|slot| (key, slot)))
                .collect()
        };
        for ((beard, chat_id), _) in &reaped {
            tracing::debug!(beard = *beard, chat_id = *chat_id, "tearing down idle instance");
        }
        reaped.len()
    }

    /// Runs [`reap_idle`](Self::reap_idle) every `reap_interval_ms`.
    ///
    /// The task ends once the delegator is dropped.
    pub fn spawn_reaper(self: &Arc<Self>) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let period = self.config.reap_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(delegator) = weak.upgrade() else {
                    break;
                };
                delegator.reap_idle();
            }
        })
    }

    /// Number of live instances.
    pub fn live_instances(&self) -> usize {
        self.instances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_live(&self, beard: &str, chat_id: ChatId) -> bool {
        self.instances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .any(|(name, chat)| *name == beard && *chat == chat_id)
    }

    async fn deliver_message(
        &self,
        descriptor: &Arc<BeardDescriptor>,
        msg: &ChatMessage,
    ) -> Result<bool, BeardError> {
        let (slot, mut instance) = self.acquire(descriptor, msg.chat_id()).await?;
        let dispatched = instance.handle_message(msg).await;
        slot.touch();
        Ok(dispatched?.is_handled())
    }

    async fn deliver_callback_query(
        &self,
        descriptor: &Arc<BeardDescriptor>,
        chat_id: ChatId,
        query: &CallbackQuery,
    ) -> Result<bool, BeardError> {
        let (slot, mut instance) = self.acquire(descriptor, chat_id).await?;
        let navigation = instance.handle_callback_query(query).await;
        slot.touch();
        Ok(navigation?.is_navigation())
    }

    /// Locks the live instance for `(descriptor, chat_id)`.
    ///
    /// The reaper may drop a slot after it was looked up but before it was
    /// locked. A lock on a slot that is no longer in the map is released and
    /// the lookup repeated, so the event goes to a live instance.
    async fn acquire(
        &self,
        descriptor: &Arc<BeardDescriptor>,
        chat_id: ChatId,
    ) -> Result<(Arc<Slot>, OwnedMutexGuard<BeardInstance>), BeardError> {
        loop {
            let slot = self.slot(descriptor, chat_id)?;
            let instance = slot.instance.clone().lock_owned().await;
            if self.is_current(descriptor.name(), chat_id, &slot) {
                return Ok((slot, instance));
            }
            tracing::debug!(
                beard = descriptor.name(),
                chat_id,
                "instance torn down before delivery, retrying"
            );
        }
    }

    fn is_current(&self, beard: &'static str, chat_id: ChatId, slot: &Arc<Slot>) -> bool {
        self.instances
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(beard, chat_id))
            .is_some_and(|live| Arc::ptr_eq(live, slot))
    }

    fn slot(
        &self,
        descriptor: &Arc<BeardDescriptor>,
        chat_id: ChatId,
    ) -> Result<Arc<Slot>, BeardError> {
        let key = (descriptor.name(), chat_id);
        let mut instances = self
            .instances
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = instances.get(&key) {
            return Ok(slot.clone());
        }

        let instance = BeardInstance::create(
            descriptor.clone(),
            self.context(descriptor, chat_id),
            self.config.apology.as_str(),
        )?;
        let timeout = self.config.timeout_for(descriptor.name(), descriptor.timeout());
        let slot = Arc::new(Slot::new(instance, timeout));
        instances.insert(key, slot.clone());
        tracing::debug!(beard = descriptor.name(), chat_id, ?timeout, "created instance");
        Ok(slot)
    }

    fn context(&self, descriptor: &BeardDescriptor, chat_id: ChatId) -> BeardContext {
        let mut builder = BeardContext::builder(
            descriptor.name(),
            chat_id,
            self.transport.clone(),
            self.identity.clone(),
        )
        .forward_logs(self.config.forward_logs)
        .key(self.key.clone());
        if descriptor.is_paginated() {
            builder = builder.pagination(
                self.store.table(descriptor.name(), PAGINATOR_TABLE),
                self.formatters.clone(),
                self.config.parse_mode,
            );
        }
        builder.build()
    }
}

impl std::fmt::Debug for Delegator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delegator")
            .field("beards", &self.registry.names().collect::<Vec<_>>())
            .field("live_instances", &self.live_instances())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Delegator`].
pub struct DelegatorBuilder {
    registry: Registry,
    transport: Arc<dyn Transport>,
    store: Option<Arc<dyn TableStore>>,
    formatters: Option<Arc<FormatterRegistry>>,
    config: Config,
}

impl DelegatorBuilder {
    /// Storage for pagination windows. Defaults to an in-memory store.
    pub fn store(mut self, store: Arc<dyn TableStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Shares an existing formatter registry.
    pub fn formatters(mut self, formatters: Arc<FormatterRegistry>) -> Self {
        self.formatters = Some(formatters);
        self
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Runs every beard's setup and freezes the registry.
    pub fn build(self) -> Result<Delegator, RegistryError> {
        let formatters = self.formatters.unwrap_or_default();
        let setup = BeardSetup {
            formatters: &formatters,
            config: &self.config,
        };
        for descriptor in self.registry.iter() {
            descriptor
                .setup(&setup)
                .map_err(|source| RegistryError::Setup {
                    beard: descriptor.name().to_owned(),
                    source,
                })?;
        }
        tracing::info!(beards = self.registry.len(), "delegator ready");

        Ok(Delegator {
            identity: Arc::new(BotIdentity::new(self.transport.clone())),
            store: self
                .store
                .unwrap_or_else(|| Arc::new(MemoryStore::new())),
            key: self.config.key.as_deref().map(Arc::from),
            registry: Arc::new(self.registry),
            transport: self.transport,
            formatters,
            config: Arc::new(self.config),
            instances: Mutex::new(HashMap::new()),
        })
    }
}
