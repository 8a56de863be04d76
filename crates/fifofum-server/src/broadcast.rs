//! Subscriber registry and message fan-out.
//!
//! Each connected WebSocket client owns a bounded queue; `send_to_all`
//! pushes the wire text into every queue without ever waiting. Delivery to
//! one subscriber cannot block or fail delivery to the others: a closed
//! queue gets that subscriber removed, a full queue drops the message for
//! that subscriber only (delivery is lossy by contract).

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{RwLock, mpsc};
use tracing::{debug, warn};

/// Per-subscriber queue depth. Sized for bursts from several pipes; a
/// client that falls further behind than this starts losing messages.
pub const SUBSCRIBER_QUEUE_CAPACITY: usize = 256;

/// Live subscriber set shared between the ingestion path (fan-out) and the
/// connection lifecycle (join/leave).
#[derive(Clone, Default)]
pub struct Broadcaster {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    subscribers: RwLock<HashMap<u64, mpsc::Sender<String>>>,
    next_id: AtomicU64,
}

impl Broadcaster {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber and return its id plus the receiving end
    /// of its queue. Every call allocates a fresh id, so re-subscription
    /// cannot clobber an existing registration.
    pub async fn subscribe(&self) -> (u64, mpsc::Receiver<String>) {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_CAPACITY);
        self.inner.subscribers.write().await.insert(id, tx);
        debug!(subscriber_id = id, "Subscriber joined");
        (id, rx)
    }

    /// Remove a subscriber. Unknown ids are a no-op, so disconnect paths
    /// may race with failure-triggered removal without harm.
    pub async fn unsubscribe(&self, id: u64) {
        if self.inner.subscribers.write().await.remove(&id).is_some() {
            debug!(subscriber_id = id, "Subscriber left");
        }
    }

    /// Number of currently registered subscribers.
    pub async fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().await.len()
    }

    /// Deliver one wire message to every subscriber, independently and in
    /// call order per subscriber.
    pub async fn send_to_all(&self, message: &str) {
        let mut dead = Vec::new();
        {
            let subscribers = self.inner.subscribers.read().await;
            for (&id, tx) in subscribers.iter() {
                match tx.try_send(message.to_string()) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        debug!(subscriber_id = id, "Subscriber queue full, dropping message");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => dead.push(id),
                }
            }
        }

        if !dead.is_empty() {
            let mut subscribers = self.inner.subscribers.write().await;
            for id in dead {
                if subscribers.remove(&id).is_some() {
                    warn!(subscriber_id = id, "Removed disconnected subscriber");
                }
            }
        }
    }
}
