//! # Sender registry
//!
//! Two-phase registration between the consuming side, which may start first,
//! and the producing channel: both look up the same [BroadcastSenderProxy] by
//! key, the consumer accepts it and waits, the channel binds itself to it.
//!
//! The registry only holds weak entries. An entry leaves the registry once its
//! proxy is bound, or once the last holder of the proxy drops it.

use crate::chunk::Chunk;
use crate::common::StaticTypeMap;
use crate::data_key::ExchangeDataKey;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::ptr;
use std::sync::{Arc, Weak};
use std::time::Duration;

mod proxy;

#[cfg(test)]
mod test;

pub use proxy::BroadcastSenderProxy;

static REGISTRIES: StaticTypeMap = StaticTypeMap::new();

const DEFAULT_PROXY_WAIT_TIMEOUT: Duration = Duration::from_secs(60);

/// Keyed directory of pending [BroadcastSenderProxy]s
pub struct SenderProxyRegistry<C> {
    proxies: RwLock<HashMap<ExchangeDataKey, Weak<BroadcastSenderProxy<C>>>>,
    proxy_wait_timeout: Duration,
}

impl<C: Chunk> SenderProxyRegistry<C> {
    /// Process-wide registry for chunk type `C`
    pub fn instance() -> Arc<Self> {
        REGISTRIES.get_or_insert_with(|| Self::build(DEFAULT_PROXY_WAIT_TIMEOUT))
    }

    /// Creates an isolated registry
    pub fn new() -> Arc<Self> {
        Self::with_proxy_wait_timeout(DEFAULT_PROXY_WAIT_TIMEOUT)
    }

    /// Creates an isolated registry whose proxies wait `timeout` for a real
    /// sender when used as a [BroadcastSender](crate::channel::BroadcastSender)
    pub fn with_proxy_wait_timeout(timeout: Duration) -> Arc<Self> {
        Arc::new(Self::build(timeout))
    }

    fn build(proxy_wait_timeout: Duration) -> Self {
        Self {
            proxies: RwLock::new(HashMap::new()),
            proxy_wait_timeout,
        }
    }

    /// Returns the live proxy for `key`, creating it if none is pending
    pub fn get_or_create(
        self: &Arc<Self>,
        key: ExchangeDataKey,
    ) -> Arc<BroadcastSenderProxy<C>> {
        // fast get with shared access
        if let Some(proxy) = self.get(&key) {
            return proxy;
        }

        // slow get with unique access
        let mut proxies = self.proxies.write();
        if let Some(proxy) = proxies.get(&key).and_then(Weak::upgrade) {
            return proxy;
        }
        let proxy = Arc::new(BroadcastSenderProxy::new(
            key,
            self.proxy_wait_timeout,
            Arc::downgrade(self),
        ));
        proxies.insert(key, Arc::downgrade(&proxy));
        proxy
    }

    /// Returns the proxy for `key` if it is still pending
    pub fn get(&self, key: &ExchangeDataKey) -> Option<Arc<BroadcastSenderProxy<C>>> {
        self.proxies.read().get(key).and_then(Weak::upgrade)
    }

    /// Drops the pending entry for `key`
    pub fn remove(&self, key: &ExchangeDataKey) -> Option<Arc<BroadcastSenderProxy<C>>> {
        self.proxies.write().remove(key).and_then(|proxy| proxy.upgrade())
    }

    /// Number of pending proxies
    pub fn len(&self) -> usize {
        self.proxies
            .read()
            .values()
            .filter(|proxy| proxy.strong_count() > 0)
            .count()
    }

    /// Whether no proxy is pending
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<C> SenderProxyRegistry<C> {
    /// Removes the entry for `key` if it still points at `proxy`
    fn retire(&self, key: &ExchangeDataKey, proxy: *const BroadcastSenderProxy<C>) {
        let mut proxies = self.proxies.write();
        let current = proxies
            .get(key)
            .map_or(false, |entry| ptr::eq(entry.as_ptr(), proxy));
        if current {
            proxies.remove(key);
        }
    }
}
