use super::*;
use crate::channel::{BroadcastReceiver, BroadcastSender, LocalBroadcastChannel, RecvDataPacket};
use crate::chunk::DataChunk;
use crate::config::LocalChannelOptions;
use crate::context::ExchangeContext;
use crate::error::ExchangeError;
use crate::status::StatusCode;
use std::thread;
use std::time::Instant;

const KEY: ExchangeDataKey = ExchangeDataKey::new(11, 5, 3);

fn channel_for(
    registry: &Arc<SenderProxyRegistry<DataChunk>>,
    key: ExchangeDataKey,
) -> Arc<LocalBroadcastChannel<DataChunk>> {
    let context = ExchangeContext::new("query-11").with_registry(Arc::clone(registry));
    LocalBroadcastChannel::new(key, "registry-test", LocalChannelOptions::default(), context)
        .unwrap()
}

fn channel(
    registry: &Arc<SenderProxyRegistry<DataChunk>>,
) -> Arc<LocalBroadcastChannel<DataChunk>> {
    channel_for(registry, KEY)
}

#[test]
fn get_or_create_returns_one_proxy_per_key() {
    let registry = SenderProxyRegistry::<DataChunk>::new();
    let lookups: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.get_or_create(KEY))
        })
        .collect();
    let proxies: Vec<_> = lookups.into_iter().map(|t| t.join().unwrap()).collect();
    for proxy in &proxies[1..] {
        assert!(Arc::ptr_eq(&proxies[0], proxy));
    }
    assert_eq!(registry.len(), 1);

    let other = registry.get_or_create(ExchangeDataKey::new(11, 5, 4));
    assert!(!Arc::ptr_eq(&proxies[0], &other));
    assert_eq!(registry.len(), 2);
}

#[test]
fn wait_accept_times_out_without_sender() {
    let registry = SenderProxyRegistry::<DataChunk>::new();
    let proxy = registry.get_or_create(KEY);
    let start = Instant::now();
    let result = proxy.wait_accept(Duration::from_millis(40));
    assert!(start.elapsed() >= Duration::from_millis(40));
    assert!(matches!(
        result,
        Err(ExchangeError::RegistrationTimeout { timeout_ms: 40, .. })
    ));
    assert!(proxy.is_accepted());
}

#[test]
fn register_times_out_without_acceptance() {
    let registry = SenderProxyRegistry::new();
    let channel = channel(&registry);
    let result = Arc::clone(&channel).register_to_senders(Duration::from_millis(30));
    assert!(matches!(
        result,
        Err(ExchangeError::RegistrationTimeout { key: KEY, .. })
    ));
    assert!(registry.get(&KEY).is_none());
    assert!(registry.is_empty());
}

#[test]
fn timed_out_registrations_leave_no_entries() {
    let registry = SenderProxyRegistry::new();
    let channels: Vec<_> = (0..50)
        .map(|index| channel_for(&registry, ExchangeDataKey::new(11, 6, index)))
        .collect();
    for channel in &channels {
        let result = Arc::clone(channel).register_to_senders(Duration::from_millis(1));
        assert!(matches!(result, Err(ExchangeError::RegistrationTimeout { .. })));
    }
    assert!(registry.is_empty());
}

#[test]
fn abandoned_proxy_is_not_reused() {
    let registry = SenderProxyRegistry::<DataChunk>::new();
    let proxy = registry.get_or_create(KEY);
    assert!(proxy.wait_accept(Duration::from_millis(10)).is_err());
    drop(proxy);
    assert!(registry.is_empty());

    let fresh = registry.get_or_create(KEY);
    assert!(!fresh.is_accepted());
    assert!(fresh.real_sender().is_none());
    assert_eq!(registry.len(), 1);
}

#[test]
fn pending_proxy_is_shared_while_held() {
    let registry = SenderProxyRegistry::<DataChunk>::new();
    let held = registry.get_or_create(KEY);
    held.accept();
    let again = registry.get_or_create(KEY);
    assert!(Arc::ptr_eq(&held, &again));
    assert!(again.is_accepted());

    let removed = registry.remove(&KEY).unwrap();
    assert!(Arc::ptr_eq(&held, &removed));
    assert!(registry.get(&KEY).is_none());
}

#[test]
fn sender_registered_first_waits_for_acceptance() {
    let registry = SenderProxyRegistry::new();
    let channel = channel(&registry);
    let registration = {
        let channel = Arc::clone(&channel);
        thread::spawn(move || channel.register_to_senders(Duration::from_millis(1000)))
    };

    thread::sleep(Duration::from_millis(50));
    let proxy = registry.get_or_create(KEY);
    let sender = proxy.wait_accept(Duration::from_millis(1000)).unwrap();
    registration.join().unwrap().unwrap();
    assert!(registry.is_empty());

    sender.send(DataChunk::new(vec![vec![1; 5]], 5));
    let deadline = Instant::now() + Duration::from_secs(1);
    assert!(matches!(channel.recv(deadline), RecvDataPacket::Chunk(_)));
}

#[test]
fn second_binding_is_rejected() {
    let registry = SenderProxyRegistry::new();
    let proxy = registry.get_or_create(KEY);
    let first: Arc<dyn BroadcastSender<DataChunk>> = channel(&registry);
    let second: Arc<dyn BroadcastSender<DataChunk>> = channel(&registry);
    proxy.become_real_sender(first).unwrap();
    assert!(matches!(
        proxy.become_real_sender(second),
        Err(ExchangeError::SenderAlreadyBound(KEY))
    ));
}

#[test]
fn proxy_without_sender_reports_not_ready() {
    let registry =
        SenderProxyRegistry::<DataChunk>::with_proxy_wait_timeout(Duration::from_millis(20));
    let proxy = registry.get_or_create(KEY);
    let status = proxy.send(DataChunk::new(vec![vec![0; 4]], 1));
    assert_eq!(status.code, StatusCode::SEND_NOT_READY);
    assert!(!status.is_modifier);
    let status = proxy.finish(StatusCode::ALL_SENDERS_DONE, "done");
    assert_eq!(status.code, StatusCode::SEND_NOT_READY);
}

#[test]
fn proxy_forwards_to_bound_sender() {
    let registry = SenderProxyRegistry::new();
    let proxy = registry.get_or_create(KEY);
    let channel = channel(&registry);
    proxy.become_real_sender(channel.clone()).unwrap();
    assert!(registry.get(&KEY).is_none());

    let status = proxy.finish(StatusCode::SEND_CANCELLED, "cancelled");
    assert!(status.is_modifier);
    assert_eq!(channel.status().code, StatusCode::SEND_CANCELLED);
    assert!(matches!(
        proxy.merge(channel.clone()),
        Err(ExchangeError::Unsupported(_))
    ));
}

#[test]
fn instance_is_shared_per_chunk_type() {
    let first = SenderProxyRegistry::<DataChunk>::instance();
    let second = SenderProxyRegistry::<DataChunk>::instance();
    assert!(Arc::ptr_eq(&first, &second));
}
