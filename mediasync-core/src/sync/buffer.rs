//! Bounded hand-off between sync producers and persistence consumers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use mediasync_model::ChannelSyncMetrics;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc};
use tokio::time::Instant;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    pub capacity: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self { capacity: 200 }
    }
}

impl BufferConfig {
    /// Small buffer for memory-constrained devices.
    pub fn memory_safe() -> Self {
        Self { capacity: 100 }
    }

    /// Large buffer for fast storage.
    pub fn throughput() -> Self {
        Self { capacity: 500 }
    }
}

/// A non-blocking send that did not enqueue its item. The item is handed
/// back in both cases.
#[derive(Debug, PartialEq, Eq)]
pub enum TrySendError<T> {
    Full(T),
    Closed(T),
}

impl<T> TrySendError<T> {
    pub fn into_inner(self) -> T {
        match self {
            TrySendError::Full(item) | TrySendError::Closed(item) => item,
        }
    }
}

impl<T> fmt::Display for TrySendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrySendError::Full(_) => f.write_str("sync buffer is full"),
            TrySendError::Closed(_) => f.write_str("sync buffer is closed"),
        }
    }
}

impl<T: fmt::Debug> std::error::Error for TrySendError<T> {}

/// The buffer was closed before the item could be enqueued.
#[derive(Debug, PartialEq, Eq)]
pub struct BufferClosed<T>(pub T);

impl<T> fmt::Display for BufferClosed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("sync buffer is closed")
    }
}

impl<T: fmt::Debug> std::error::Error for BufferClosed<T> {}

#[derive(Debug, Default)]
struct Counters {
    sent: AtomicU64,
    received: AtomicU64,
    backpressure: AtomicU64,
}

/// Multi-producer, multi-consumer FIFO with a fixed capacity.
///
/// Counters are atomics so [`metrics`](Self::metrics) never waits on either
/// side. Closing drops the buffer's own sender; consumers keep draining
/// what is queued and then observe `None`.
pub struct ChannelSyncBuffer<T> {
    sender: RwLock<Option<mpsc::Sender<T>>>,
    receiver: Mutex<mpsc::Receiver<T>>,
    capacity: usize,
    counters: Counters,
    created_at: Instant,
}

impl<T> fmt::Debug for ChannelSyncBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelSyncBuffer")
            .field("capacity", &self.capacity)
            .field("closed", &self.is_closed())
            .field("metrics", &self.metrics())
            .finish()
    }
}

impl<T> ChannelSyncBuffer<T> {
    pub fn new(config: &BufferConfig) -> Self {
        let capacity = config.capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            sender: RwLock::new(Some(tx)),
            receiver: Mutex::new(rx),
            capacity,
            counters: Counters::default(),
            created_at: Instant::now(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn sender(&self) -> Option<mpsc::Sender<T>> {
        self.sender
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_closed(&self) -> bool {
        self.sender
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Enqueue without waiting. A full buffer counts as one backpressure
    /// event.
    pub fn try_send(&self, item: T) -> Result<(), TrySendError<T>> {
        let Some(sender) = self.sender() else {
            return Err(TrySendError::Closed(item));
        };

        match sender.try_send(item) {
            Ok(()) => {
                self.counters.sent.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(item)) => {
                self.counters.backpressure.fetch_add(1, Ordering::Relaxed);
                Err(TrySendError::Full(item))
            }
            Err(mpsc::error::TrySendError::Closed(item)) => {
                Err(TrySendError::Closed(item))
            }
        }
    }

    /// Enqueue, waiting for capacity when the buffer is full.
    pub async fn send(&self, item: T) -> Result<(), BufferClosed<T>> {
        let item = match self.try_send(item) {
            Ok(()) => return Ok(()),
            Err(TrySendError::Closed(item)) => return Err(BufferClosed(item)),
            Err(TrySendError::Full(item)) => item,
        };

        trace!(capacity = self.capacity, "sync buffer full; waiting");
        let Some(sender) = self.sender() else {
            return Err(BufferClosed(item));
        };
        sender
            .send(item)
            .await
            .map_err(|mpsc::error::SendError(item)| BufferClosed(item))?;
        self.counters.sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Next item, waiting if the buffer is empty. `None` once the buffer
    /// is closed and drained.
    pub async fn receive(&self) -> Option<T> {
        let item = self.receiver.lock().await.recv().await;
        if item.is_some() {
            self.counters.received.fetch_add(1, Ordering::Relaxed);
        }
        item
    }

    /// `Ok(None)` when nothing is queued right now (or another consumer is
    /// mid-receive); `Err` once closed and drained.
    pub fn try_receive(&self) -> Result<Option<T>, BufferClosed<()>> {
        let Ok(mut receiver) = self.receiver.try_lock() else {
            return Ok(None);
        };
        match receiver.try_recv() {
            Ok(item) => {
                self.counters.received.fetch_add(1, Ordering::Relaxed);
                Ok(Some(item))
            }
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(BufferClosed(())),
        }
    }

    /// Stop accepting items. Already-queued items stay receivable.
    pub fn close(&self) {
        self.sender
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn metrics(&self) -> ChannelSyncMetrics {
        let sent = self.counters.sent.load(Ordering::Relaxed);
        let received = self.counters.received.load(Ordering::Relaxed);
        let elapsed = self.created_at.elapsed().as_secs_f64();
        let throughput_per_sec = if elapsed > 0.0 {
            received as f64 / elapsed
        } else {
            0.0
        };

        ChannelSyncMetrics {
            items_sent: sent,
            items_received: received,
            items_in_buffer: sent.saturating_sub(received),
            backpressure_events: self.counters.backpressure.load(Ordering::Relaxed),
            throughput_per_sec,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    fn buffer(capacity: usize) -> ChannelSyncBuffer<u32> {
        ChannelSyncBuffer::new(&BufferConfig { capacity })
    }

    #[tokio::test]
    async fn try_send_fails_once_full_and_counts_backpressure() {
        let buffer = buffer(3);
        for i in 0..3 {
            buffer.try_send(i).unwrap();
        }

        let mut last = 0;
        for i in 3..6 {
            assert_eq!(buffer.try_send(i), Err(TrySendError::Full(i)));
            let events = buffer.metrics().backpressure_events;
            assert!(events > last);
            last = events;
        }

        let metrics = buffer.metrics();
        assert_eq!(metrics.items_sent, 3);
        assert_eq!(metrics.items_in_buffer, 3);
    }

    #[tokio::test]
    async fn items_in_buffer_tracks_sent_minus_received() {
        let buffer = buffer(8);
        for i in 0..5 {
            buffer.send(i).await.unwrap();
        }
        assert_eq!(buffer.receive().await, Some(0));
        assert_eq!(buffer.try_receive().unwrap(), Some(1));

        let metrics = buffer.metrics();
        assert_eq!(metrics.items_received, 2);
        assert_eq!(metrics.items_in_buffer, 3);
    }

    #[tokio::test]
    async fn blocked_send_completes_when_consumer_drains() {
        let buffer = Arc::new(buffer(1));
        buffer.send(1).await.unwrap();

        let producer = {
            let buffer = Arc::clone(&buffer);
            tokio::spawn(async move { buffer.send(2).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!producer.is_finished());

        assert_eq!(buffer.receive().await, Some(1));
        producer.await.unwrap().unwrap();
        assert_eq!(buffer.receive().await, Some(2));
        assert!(buffer.metrics().backpressure_events >= 1);
    }

    #[tokio::test]
    async fn close_keeps_queued_items_then_ends() {
        let buffer = buffer(4);
        buffer.send(1).await.unwrap();
        buffer.send(2).await.unwrap();
        buffer.close();

        assert_eq!(buffer.try_send(3), Err(TrySendError::Closed(3)));
        assert_eq!(buffer.send(4).await, Err(BufferClosed(4)));
        assert_eq!(buffer.receive().await, Some(1));
        assert_eq!(buffer.receive().await, Some(2));
        assert_eq!(buffer.receive().await, None);
        assert!(buffer.try_receive().is_err());
    }

    #[tokio::test]
    async fn concurrent_consumers_receive_every_item_once() {
        let buffer = Arc::new(buffer(16));
        let mut consumers = tokio::task::JoinSet::new();
        for _ in 0..3 {
            let buffer = Arc::clone(&buffer);
            consumers.spawn(async move {
                let mut seen = Vec::new();
                while let Some(item) = buffer.receive().await {
                    seen.push(item);
                }
                seen
            });
        }

        for i in 0..500 {
            buffer.send(i).await.unwrap();
        }
        buffer.close();

        let mut all = Vec::new();
        while let Some(seen) = consumers.join_next().await {
            all.extend(seen.unwrap());
        }
        all.sort_unstable();
        assert_eq!(all, (0..500).collect::<Vec<_>>());
        assert_eq!(buffer.metrics().items_in_buffer, 0);
    }

    #[test]
    fn presets_expose_both_ends() {
        assert_eq!(BufferConfig::default().capacity, 200);
        assert_eq!(BufferConfig::memory_safe().capacity, 100);
        assert_eq!(BufferConfig::throughput().capacity, 500);
    }
}
