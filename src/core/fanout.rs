//! Realtime fan-out: the subscriber registry for the `/ws/logs` stream.
//!
//! This is the only shared mutable in-process collection in the WAF, so it
//! stays behind a plain mutex rather than anything lock-free. Senders whose
//! receiver has gone away are swept out during broadcast.

use std::{
    collections::HashMap,
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};

use tokio::sync::mpsc;

use crate::metrics;

pub type SubscriberId = u64;

/// Registry of realtime log subscribers.
#[derive(Debug, Default)]
pub struct LogFanout {
    subscribers: Mutex<HashMap<SubscriberId, mpsc::UnboundedSender<String>>>,
    next_id: AtomicU64,
}

impl LogFanout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber; the returned receiver yields broadcast events
    /// until [`detach`](Self::detach) is called or the fanout drops the
    /// subscriber after a failed send.
    pub fn attach(&self) -> (SubscriberId, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.insert(id, tx);
        metrics::set_ws_subscribers(subscribers.len());
        (id, rx)
    }

    pub fn detach(&self, id: SubscriberId) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.remove(&id);
        metrics::set_ws_subscribers(subscribers.len());
    }

    /// Send `message` to every subscriber serially. Subscribers whose channel
    /// is closed are removed before returning.
    pub fn broadcast(&self, message: &str) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let mut dead: Vec<SubscriberId> = Vec::new();
        for (id, tx) in subscribers.iter() {
            if tx.send(message.to_string()).is_err() {
                dead.push(*id);
            }
        }
        for id in dead {
            subscribers.remove(&id);
        }

        metrics::increment_ws_events();
        metrics::set_ws_subscribers(subscribers.len());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
