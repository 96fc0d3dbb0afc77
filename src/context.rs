//! Explicit collaborators of a channel

use crate::chunk::Chunk;
use crate::exchange_log::ExchangeLogSink;
use crate::memory::{MemoryAccounting, MemoryTracker};
use crate::registry::SenderProxyRegistry;
use std::sync::Arc;

/// Collaborators a channel reports to
///
/// Passed explicitly at construction so a channel never reaches for
/// ambient process state on its own
pub struct ExchangeContext<C> {
    initial_query_id: String,
    memory: Arc<dyn MemoryAccounting>,
    exchange_log: Option<Arc<dyn ExchangeLogSink>>,
    registry: Arc<SenderProxyRegistry<C>>,
}

impl<C: Chunk> ExchangeContext<C> {
    /// Context of query `initial_query_id` using the process-wide sender
    /// registry, a fresh [MemoryTracker] and no exchange log
    pub fn new(initial_query_id: impl Into<String>) -> Self {
        Self {
            initial_query_id: initial_query_id.into(),
            memory: MemoryTracker::new(),
            exchange_log: None,
            registry: SenderProxyRegistry::instance(),
        }
    }

    /// Replaces the memory accounting
    pub fn with_memory(mut self, memory: Arc<dyn MemoryAccounting>) -> Self {
        self.memory = memory;
        self
    }

    /// Sets the sink receiving teardown records
    pub fn with_exchange_log(mut self, exchange_log: Arc<dyn ExchangeLogSink>) -> Self {
        self.exchange_log = Some(exchange_log);
        self
    }

    /// Replaces the sender registry
    pub fn with_registry(mut self, registry: Arc<SenderProxyRegistry<C>>) -> Self {
        self.registry = registry;
        self
    }
}

impl<C> ExchangeContext<C> {
    /// Query that started the distributed execution
    pub fn initial_query_id(&self) -> &str {
        &self.initial_query_id
    }

    pub(crate) fn memory(&self) -> &dyn MemoryAccounting {
        self.memory.as_ref()
    }

    pub(crate) fn exchange_log(&self) -> Option<&dyn ExchangeLogSink> {
        self.exchange_log.as_deref()
    }

    pub(crate) fn registry(&self) -> &Arc<SenderProxyRegistry<C>> {
        &self.registry
    }
}

impl<C> Clone for ExchangeContext<C> {
    fn clone(&self) -> Self {
        Self {
            initial_query_id: self.initial_query_id.clone(),
            memory: Arc::clone(&self.memory),
            exchange_log: self.exchange_log.clone(),
            registry: Arc::clone(&self.registry),
        }
    }
}
