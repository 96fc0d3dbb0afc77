use super::SenderProxyRegistry;
use crate::channel::BroadcastSender;
use crate::data_key::ExchangeDataKey;
use crate::error::{ExchangeError, Result};
use crate::status::{BroadcastStatus, StatusCode};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tracing::debug;

/// Placeholder for a sender that may not exist yet
///
/// Producer-side code can hold the proxy and use it as a
/// [BroadcastSender] right away; calls wait until the real channel is bound.
/// The proxy leaves its registry when it is bound or dropped.
pub struct BroadcastSenderProxy<C> {
    data_key: ExchangeDataKey,
    name: String,
    state: Mutex<ProxyState<C>>,
    accepted: Condvar,
    bound: Condvar,
    wait_timeout: Duration,
    registry: Weak<SenderProxyRegistry<C>>,
}

struct ProxyState<C> {
    accepted: bool,
    real_sender: Option<Arc<dyn BroadcastSender<C>>>,
}

impl<C> BroadcastSenderProxy<C> {
    pub(super) fn new(
        data_key: ExchangeDataKey,
        wait_timeout: Duration,
        registry: Weak<SenderProxyRegistry<C>>,
    ) -> Self {
        Self {
            name: format!("BroadcastSenderProxy[{}]", data_key),
            data_key,
            state: Mutex::new(ProxyState {
                accepted: false,
                real_sender: None,
            }),
            accepted: Condvar::new(),
            bound: Condvar::new(),
            wait_timeout,
            registry,
        }
    }

    /// Identity the proxy stands for
    pub fn data_key(&self) -> &ExchangeDataKey {
        &self.data_key
    }

    /// Announces that a party is attached to this proxy
    pub fn accept(&self) {
        let mut state = self.state.lock();
        if !state.accepted {
            state.accepted = true;
            drop(state);
            self.accepted.notify_all();
        }
    }

    /// Whether [accept](Self::accept) was called
    pub fn is_accepted(&self) -> bool {
        self.state.lock().accepted
    }

    /// Accepts the proxy and waits until a real sender is bound to it
    pub fn wait_accept(&self, timeout: Duration) -> Result<Arc<dyn BroadcastSender<C>>> {
        self.accept();
        self.wait_become_real_sender(timeout)
    }

    /// Waits until some party has accepted the proxy
    pub fn wait_for_accept(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while !state.accepted {
            if self.accepted.wait_until(&mut state, deadline).timed_out() && !state.accepted {
                return Err(self.timeout_error(timeout));
            }
        }
        Ok(())
    }

    /// Waits until a real sender is bound and returns it
    pub fn wait_become_real_sender(
        &self,
        timeout: Duration,
    ) -> Result<Arc<dyn BroadcastSender<C>>> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if let Some(sender) = &state.real_sender {
                return Ok(Arc::clone(sender));
            }
            if self.bound.wait_until(&mut state, deadline).timed_out() {
                return Self::bound_sender(&state).ok_or_else(|| self.timeout_error(timeout));
            }
        }
    }

    /// Binds the concrete channel and retires the registry entry; allowed once
    pub fn become_real_sender(&self, sender: Arc<dyn BroadcastSender<C>>) -> Result<()> {
        let mut state = self.state.lock();
        if state.real_sender.is_some() {
            return Err(ExchangeError::SenderAlreadyBound(self.data_key));
        }
        debug!(proxy = %self.name, sender = sender.name(), "proxy became real sender");
        state.real_sender = Some(sender);
        drop(state);
        self.bound.notify_all();
        self.retire();
        Ok(())
    }

    /// The bound sender, if any
    pub fn real_sender(&self) -> Option<Arc<dyn BroadcastSender<C>>> {
        Self::bound_sender(&self.state.lock())
    }

    fn bound_sender(state: &ProxyState<C>) -> Option<Arc<dyn BroadcastSender<C>>> {
        state.real_sender.as_ref().map(Arc::clone)
    }

    fn retire(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.retire(&self.data_key, self);
        }
    }

    fn timeout_error(&self, timeout: Duration) -> ExchangeError {
        ExchangeError::RegistrationTimeout {
            key: self.data_key,
            timeout_ms: timeout.as_millis().min(u64::MAX as u128) as u64,
        }
    }

    fn not_ready(&self) -> BroadcastStatus {
        BroadcastStatus::new(
            StatusCode::SEND_NOT_READY,
            format!(
                "{} has no real sender after ms: {}",
                self.name,
                self.wait_timeout.as_millis()
            ),
        )
    }
}

impl<C> BroadcastSender<C> for BroadcastSenderProxy<C> {
    fn send(&self, chunk: C) -> BroadcastStatus {
        match self.wait_become_real_sender(self.wait_timeout) {
            Ok(sender) => sender.send(chunk),
            Err(_) => self.not_ready(),
        }
    }

    fn finish(&self, code: StatusCode, message: &str) -> BroadcastStatus {
        match self.wait_become_real_sender(self.wait_timeout) {
            Ok(sender) => sender.finish(code, message),
            Err(_) => self.not_ready(),
        }
    }

    fn merge(&self, sender: Arc<dyn BroadcastSender<C>>) -> Result<()> {
        self.wait_become_real_sender(self.wait_timeout)?.merge(sender)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<C> Drop for BroadcastSenderProxy<C> {
    fn drop(&mut self) {
        self.retire();
    }
}

impl<C> fmt::Debug for BroadcastSenderProxy<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("BroadcastSenderProxy")
            .field("data_key", &self.data_key)
            .field("accepted", &state.accepted)
            .field("bound", &state.real_sender.is_some())
            .finish()
    }
}
