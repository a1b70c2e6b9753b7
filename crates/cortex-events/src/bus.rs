//! Topic-keyed event bus
//!
//! Each consumer (callback subscription or pull iterator) is one unbounded
//! mpsc channel registered under a topic. `publish` sends a clone of the
//! event into every channel registered on that topic while holding the
//! listener lock, so every consumer sees events in publish order and
//! registration/removal never races a fan-out.

use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::{debug, trace};

struct Listener<E> {
    id: u64,
    tx: mpsc::UnboundedSender<E>,
}

type ListenerMap<E> = HashMap<String, Vec<Listener<E>>>;

struct BusInner<E> {
    topics: Mutex<ListenerMap<E>>,
    next_id: AtomicU64,
}

impl<E> BusInner<E> {
    fn lock(&self) -> MutexGuard<'_, ListenerMap<E>> {
        // A panic while holding the lock leaves the map itself consistent
        self.topics.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn register(&self, topic: &str, tx: mpsc::UnboundedSender<E>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock()
            .entry(topic.to_string())
            .or_default()
            .push(Listener { id, tx });
        debug!(topic = %topic, listener = id, "Registered listener");
        id
    }

    fn unregister(&self, topic: &str, id: u64) {
        let mut topics = self.lock();
        if let Some(listeners) = topics.get_mut(topic) {
            listeners.retain(|l| l.id != id);
            if listeners.is_empty() {
                topics.remove(topic);
            }
        }
        debug!(topic = %topic, listener = id, "Removed listener");
    }
}

/// In-process publish/subscribe bus partitioned by topic
pub struct EventBus<E> {
    inner: Arc<BusInner<E>>,
}

impl<E> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Clone + Send + 'static> EventBus<E> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BusInner {
                topics: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Fan `event` out to every listener currently registered on `topic`.
    ///
    /// Never blocks and never buffers: with no listeners the event is
    /// dropped. Returns the number of listeners that received it.
    pub fn publish(&self, topic: &str, event: E) -> usize {
        let mut topics = self.inner.lock();
        let Some(listeners) = topics.get_mut(topic) else {
            trace!(topic = %topic, "Publish with no listeners");
            return 0;
        };

        // Consumers that went away without unregistering are pruned here
        listeners.retain(|l| l.tx.send(event.clone()).is_ok());
        let delivered = listeners.len();
        if listeners.is_empty() {
            topics.remove(topic);
        }
        delivered
    }

    /// Register `callback` for every event published on `topic` from now on.
    ///
    /// Events are delivered in publish order on a task spawned onto the
    /// current Tokio runtime, so this must be called from within one.
    /// Dropping or calling [`Subscription::unsubscribe`] removes exactly
    /// this callback.
    pub fn subscribe<F>(&self, topic: &str, callback: F) -> Subscription<E>
    where
        F: Fn(E) + Send + Sync + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = self.inner.register(topic, tx);

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                callback(event);
            }
        });

        Subscription {
            guard: ListenerGuard {
                inner: Arc::clone(&self.inner),
                topic: topic.to_string(),
                id,
            },
        }
    }

    /// Open an independent buffered consumer of `topic`.
    ///
    /// Only events published after this call are observed. Dropping the
    /// stream (or calling [`EventStream::close`]) removes its listener
    /// without affecting other consumers of the same topic.
    pub fn iterate(&self, topic: &str) -> EventStream<E> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.inner.register(topic, tx);

        EventStream {
            rx,
            guard: ListenerGuard {
                inner: Arc::clone(&self.inner),
                topic: topic.to_string(),
                id,
            },
        }
    }

    /// Number of listeners currently registered on `topic`
    pub fn listener_count(&self, topic: &str) -> usize {
        self.inner.lock().get(topic).map(Vec::len).unwrap_or(0)
    }
}

impl<E: Clone + Send + 'static> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

struct ListenerGuard<E> {
    inner: Arc<BusInner<E>>,
    topic: String,
    id: u64,
}

impl<E> Drop for ListenerGuard<E> {
    fn drop(&mut self) {
        self.inner.unregister(&self.topic, self.id);
    }
}

/// Handle for a callback registration; removes it when dropped
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription<E> {
    guard: ListenerGuard<E>,
}

impl<E> Subscription<E> {
    pub fn topic(&self) -> &str {
        &self.guard.topic
    }

    /// Remove this callback from the bus
    pub fn unsubscribe(self) {
        drop(self);
    }
}

/// Pull-based consumer of one topic
pub struct EventStream<E> {
    rx: mpsc::UnboundedReceiver<E>,
    guard: ListenerGuard<E>,
}

impl<E> EventStream<E> {
    pub fn topic(&self) -> &str {
        &self.guard.topic
    }

    /// Next queued event, waiting for a publish if the queue is empty
    pub async fn next_event(&mut self) -> Option<E> {
        self.rx.recv().await
    }

    /// Next queued event without waiting
    pub fn try_next_event(&mut self) -> Option<E> {
        self.rx.try_recv().ok()
    }

    /// Stop consuming; queued events are discarded
    pub fn close(self) {
        drop(self);
    }
}

impl<E> Stream for EventStream<E> {
    type Item = E;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<E>> {
        self.rx.poll_recv(cx)
    }
}
