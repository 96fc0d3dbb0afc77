use super::metrics::{ReceiverMetrics, SenderMetrics};
use super::{
    BroadcastReceiver, BroadcastSender, RecvDataPacket, ReceiverMetricsSnapshot,
    SenderMetricsSnapshot,
};
use crate::chunk::Chunk;
use crate::config::LocalChannelOptions;
use crate::context::ExchangeContext;
use crate::data_key::ExchangeDataKey;
use crate::error::{ExchangeError, Result};
use crate::exchange_log::ExchangeLogElement;
use crate::queue::{TransportPacket, TransportQueue};
use crate::status::{BroadcastStatus, StatusCode};
use arc_swap::ArcSwap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, error, trace, warn};

/// In-process broadcast channel
///
/// Producers and consumers run on different threads and share the channel
/// through an `Arc`. The teardown record goes to the exchange log exactly
/// once, on [finalize](Self::finalize) or when the last handle is dropped.
pub struct LocalBroadcastChannel<C: Chunk> {
    name: String,
    data_key: ExchangeDataKey,
    options: LocalChannelOptions,
    queue: TransportQueue<TransportPacket<C>>,
    running: Arc<BroadcastStatus>,
    status: ArcSwap<BroadcastStatus>,
    max_deadline: Instant,
    context: ExchangeContext<C>,
    sender_metrics: SenderMetrics,
    receiver_metrics: ReceiverMetrics,
    finalized: AtomicBool,
}

impl<C: Chunk> LocalBroadcastChannel<C> {
    /// Creates a channel for `data_key`
    pub fn new(
        data_key: ExchangeDataKey,
        name: impl Into<String>,
        options: LocalChannelOptions,
        context: ExchangeContext<C>,
    ) -> Result<Arc<Self>> {
        options.validate()?;
        let running = Arc::new(BroadcastStatus::running());
        Ok(Arc::new(Self {
            name: name.into(),
            data_key,
            queue: TransportQueue::new(options.queue_size),
            status: ArcSwap::new(Arc::clone(&running)),
            running,
            max_deadline: Instant::now() + options.max_timeout(),
            options,
            context,
            sender_metrics: SenderMetrics::default(),
            receiver_metrics: ReceiverMetrics::default(),
            finalized: AtomicBool::new(false),
        }))
    }

    /// Channel name in logs
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity of the channel
    pub fn data_key(&self) -> &ExchangeDataKey {
        &self.data_key
    }

    /// Current shared status
    pub fn status(&self) -> BroadcastStatus {
        BroadcastStatus::clone(&self.status.load())
    }

    /// Whether the transport queue is closed
    pub fn is_closed(&self) -> bool {
        self.queue.closed()
    }

    /// Sender side counters collected so far
    pub fn sender_metrics(&self) -> SenderMetricsSnapshot {
        self.sender_metrics.snapshot()
    }

    /// Receiver side counters collected so far
    pub fn receiver_metrics(&self) -> ReceiverMetricsSnapshot {
        self.receiver_metrics.snapshot()
    }

    /// Writes the teardown record to the exchange log
    ///
    /// Only the first call (or the drop of the last handle) writes; failures
    /// are logged and swallowed
    pub fn finalize(&self) {
        if self.finalized.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(err) = self.write_exchange_log() {
            warn!(channel = %self.name, error = %err, "failed to write exchange log");
        }
    }

    fn send_impl(&self, chunk: C) -> BroadcastStatus {
        let current = self.status();
        if current.is_terminal() {
            return current;
        }

        let rows = chunk.rows();
        let bytes = chunk.bytes();
        let allocated_bytes = chunk.allocated_bytes();
        self.context.memory().move_to_global(allocated_bytes);
        let pushed = self
            .queue
            .try_emplace_until(self.max_deadline, TransportPacket::Data(chunk));
        if pushed.is_ok() {
            if self.options.enable_sender_metrics {
                self.sender_metrics.add_sent(rows, bytes);
            }
            return self.status();
        }
        self.context.memory().move_to_thread(allocated_bytes);

        // finished by another thread, the queue is closed
        if self.queue.closed() {
            let current = self.status();
            if current.is_terminal() {
                return current;
            }
            // queue closed but the status is not published yet
            return BroadcastStatus::new(
                StatusCode::SEND_UNKNOWN_ERROR,
                "Send operation was interrupted",
            );
        }

        self.finish(
            StatusCode::SEND_TIMEOUT,
            &format!(
                "Send to channel {} timeout after ms: {}",
                self.name, self.options.max_timeout_ms
            ),
        )
    }

    fn recv_impl(&self, deadline: Instant, start: Instant) -> RecvDataPacket<C> {
        let current = self.status();
        // abort codes discard in-flight data, graceful ones drain it first
        if current.code.is_abort() {
            return RecvDataPacket::Status(current);
        }

        match self.queue.try_pop_until(deadline) {
            Some(TransportPacket::Data(chunk)) => {
                if self.options.enable_receiver_metrics {
                    self.receiver_metrics.add_recv_bytes(chunk.bytes());
                }
                self.context.memory().move_to_thread(chunk.allocated_bytes());
                RecvDataPacket::Chunk(chunk)
            }
            Some(TransportPacket::EndOfStream) => {
                self.queue.close();
                RecvDataPacket::Status(self.status())
            }
            None if self.queue.closed() => RecvDataPacket::Status(self.status()),
            None => RecvDataPacket::Status(self.finish(
                StatusCode::RECV_TIMEOUT,
                &format!(
                    "Receive from channel {} timeout after ms: {}",
                    self.name,
                    deadline.saturating_duration_since(start).as_millis()
                ),
            )),
        }
    }

    fn write_exchange_log(&self) -> Result<()> {
        if !self.options.metrics_enabled() {
            return Ok(());
        }
        let exchange_log = match self.context.exchange_log() {
            Some(exchange_log) => exchange_log,
            None => return Ok(()),
        };

        let sender = self.sender_metrics.snapshot();
        let receiver = self.receiver_metrics.snapshot();
        let event_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();
        exchange_log.add(ExchangeLogElement {
            initial_query_id: self.context.initial_query_id().to_string(),
            exchange_id: self.data_key.exchange_id.to_string(),
            partition_id: self.data_key.parallel_index.to_string(),
            kind: "local".to_string(),
            event_time,
            send_time_ms: sender.send_time_ms,
            send_rows: sender.send_rows,
            send_uncompressed_bytes: sender.send_uncompressed_bytes,
            finish_code: sender.finish_code,
            is_modifier: sender.is_modifier,
            message: sender.message,
            recv_time_ms: receiver.recv_time_ms,
            register_time_ms: receiver.register_time_ms,
            recv_bytes: receiver.recv_bytes,
        })
    }
}

impl<C: Chunk> BroadcastSender<C> for LocalBroadcastChannel<C> {
    fn send(&self, chunk: C) -> BroadcastStatus {
        let start = Instant::now();
        let status = self.send_impl(chunk);
        if self.options.enable_sender_metrics {
            self.sender_metrics.add_send_time(start.elapsed());
        }
        status
    }

    fn finish(&self, code: StatusCode, message: &str) -> BroadcastStatus {
        if !code.is_terminal() {
            warn!(channel = %self.name, "ignoring finish with non-terminal code");
            return self.status();
        }

        let candidate = Arc::new(BroadcastStatus::new(code, message));
        let previous = self
            .status
            .compare_and_swap(&self.running, Arc::clone(&candidate));

        if Arc::ptr_eq(&*previous, &self.running) {
            debug!(
                channel = %self.name,
                from = %previous.code,
                to = %code,
                reason = message,
                "broadcast status changed"
            );
            if code.is_abort() {
                self.queue.close();
            } else if self
                .queue
                .try_emplace_until(self.max_deadline, TransportPacket::EndOfStream)
                .is_err()
            {
                // the other side closed first
                trace!(channel = %self.name, "end of stream mark not delivered");
            }
            self.sender_metrics.record_finish(&candidate, true);
            BroadcastStatus::clone(&candidate).as_modifier(true)
        } else {
            trace!(
                channel = %self.name,
                attempted = %code,
                current = %previous.code,
                reason = message,
                "failed to change broadcast status"
            );
            let winner = BroadcastStatus::clone(&previous);
            self.sender_metrics.record_finish(&winner, false);
            winner
        }
    }

    fn merge(&self, _sender: Arc<dyn BroadcastSender<C>>) -> Result<()> {
        error!(channel = %self.name, "merge is not implemented for LocalBroadcastChannel");
        Err(ExchangeError::Unsupported(
            "merge is not implemented for LocalBroadcastChannel".to_string(),
        ))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<C: Chunk> BroadcastReceiver<C> for LocalBroadcastChannel<C> {
    fn recv(&self, deadline: Instant) -> RecvDataPacket<C> {
        let start = Instant::now();
        let packet = self.recv_impl(deadline, start);
        if self.options.enable_receiver_metrics {
            self.receiver_metrics.add_recv_time(start.elapsed());
        }
        packet
    }

    fn register_to_senders(self: Arc<Self>, timeout: Duration) -> Result<()> {
        let start = Instant::now();
        let proxy = self.context.registry().get_or_create(self.data_key);
        proxy.wait_for_accept(timeout)?;
        let sender: Arc<dyn BroadcastSender<C>> = self.clone();
        proxy.become_real_sender(sender)?;
        let elapsed = start.elapsed();
        if self.options.enable_receiver_metrics {
            self.receiver_metrics.add_register_time(elapsed);
        }
        debug!(
            channel = %self.name,
            elapsed_ms = elapsed.as_millis() as u64,
            "registered to senders"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<C: Chunk> Drop for LocalBroadcastChannel<C> {
    fn drop(&mut self) {
        self.finalize();
    }
}

impl<C: Chunk> fmt::Debug for LocalBroadcastChannel<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalBroadcastChannel")
            .field("name", &self.name)
            .field("data_key", &self.data_key)
            .field("status", &self.status())
            .field("queue", &self.queue)
            .finish()
    }
}
