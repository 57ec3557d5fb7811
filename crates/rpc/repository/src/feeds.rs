//! Live feed fan-out for newly observed blocks and transactions.
//!
//! Every subscriber gets its own bounded channel. Publishing never blocks the
//! synchronization loop: when a subscriber's buffer is full the configured
//! [`OverflowPolicy`] decides whether the notification is dropped for that
//! subscriber or the subscriber is disconnected.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_stream::wrappers::ReceiverStream;

use opera_api_types::{Block, Transaction};

/// What to do with a subscriber whose buffer is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Drop the notification for that subscriber only.
    #[default]
    Drop,
    /// Remove the subscriber; its receiver ends.
    Disconnect,
}

/// Settings shared by all feeds.
#[derive(Debug, Clone, Copy)]
pub struct FeedConfig {
    /// Per-subscriber buffer capacity.
    pub buffer: usize,
    pub overflow: OverflowPolicy,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            buffer: 64,
            overflow: OverflowPolicy::Drop,
        }
    }
}

/// Receiving half handed to a feed subscriber.
#[derive(Debug)]
pub struct FeedSubscription<T> {
    pub id: u64,
    pub receiver: mpsc::Receiver<T>,
}

impl<T> FeedSubscription<T> {
    pub async fn recv(&mut self) -> Option<T> {
        self.receiver.recv().await
    }

    /// Adapt into a `Stream` for streaming transports.
    pub fn into_stream(self) -> ReceiverStream<T> {
        ReceiverStream::new(self.receiver)
    }
}

struct Subscriber<T> {
    sender: mpsc::Sender<T>,
    dropped: AtomicU64,
}

/// Single-writer, many-reader notification hub.
pub struct FeedHub<T> {
    config: FeedConfig,
    next_id: AtomicU64,
    subscribers: RwLock<BTreeMap<u64, Subscriber<T>>>,
}

impl<T: Clone + Send> FeedHub<T> {
    pub fn new(config: FeedConfig) -> Self {
        Self {
            config,
            next_id: AtomicU64::new(1),
            subscribers: RwLock::new(BTreeMap::new()),
        }
    }

    /// Register a new subscriber.
    pub fn subscribe(&self) -> FeedSubscription<T> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (sender, receiver) = mpsc::channel(self.config.buffer.max(1));
        self.subscribers.write().insert(
            id,
            Subscriber {
                sender,
                dropped: AtomicU64::new(0),
            },
        );
        FeedSubscription { id, receiver }
    }

    /// Remove a subscriber by ID. Returns true if it existed.
    pub fn unsubscribe(&self, id: u64) -> bool {
        self.subscribers.write().remove(&id).is_some()
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Notifications dropped for subscriber `id` because its buffer was full.
    pub fn dropped(&self, id: u64) -> Option<u64> {
        self.subscribers
            .read()
            .get(&id)
            .map(|s| s.dropped.load(Ordering::Relaxed))
    }

    /// Deliver `item` to every subscriber without waiting.
    ///
    /// Returns the number of subscribers that received it.
    pub fn publish(&self, item: &T) -> usize {
        let mut delivered = 0;
        let mut evicted = Vec::new();
        {
            let subscribers = self.subscribers.read();
            for (id, subscriber) in subscribers.iter() {
                match subscriber.sender.try_send(item.clone()) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => match self.config.overflow {
                        OverflowPolicy::Drop => {
                            let dropped = subscriber.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                            tracing::debug!(
                                subscriber = id,
                                dropped,
                                "feed buffer full, notification dropped"
                            );
                        }
                        OverflowPolicy::Disconnect => {
                            tracing::warn!(
                                subscriber = id,
                                "feed buffer full, disconnecting subscriber"
                            );
                            evicted.push(*id);
                        }
                    },
                    Err(TrySendError::Closed(_)) => evicted.push(*id),
                }
            }
        }

        if !evicted.is_empty() {
            let mut subscribers = self.subscribers.write();
            for id in evicted {
                subscribers.remove(&id);
            }
        }
        delivered
    }

    /// Drop every subscriber; their receivers end once drained.
    pub fn close(&self) {
        self.subscribers.write().clear();
    }
}

/// The two live feeds fed by the synchronization orchestrator.
#[derive(Clone)]
pub struct LiveFeeds {
    pub blocks: Arc<FeedHub<Block>>,
    pub transactions: Arc<FeedHub<Transaction>>,
}

impl LiveFeeds {
    pub fn new(config: FeedConfig) -> Self {
        Self {
            blocks: Arc::new(FeedHub::new(config)),
            transactions: Arc::new(FeedHub::new(config)),
        }
    }

    pub fn close(&self) {
        self.blocks.close();
        self.transactions.close();
    }
}
