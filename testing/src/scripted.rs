//! Hand-driven async responses
//!
//! A [`ResponseScript`] lets a test play the remote side of a request. The
//! test registers a [`Responder`] per key before the request is made; the
//! request suspends until the test calls [`Responder::respond`]. Settling
//! responders in a chosen order reproduces races such as a slow response
//! arriving after a newer one.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;

/// Pending responses keyed by request
///
/// Cloning shares the same script, so one clone can live inside a mock
/// environment while the test keeps another.
#[derive(Debug)]
pub struct ResponseScript<K, V> {
    pending: Arc<Mutex<HashMap<K, VecDeque<oneshot::Receiver<V>>>>>,
}

impl<K, V> Clone for ResponseScript<K, V> {
    fn clone(&self) -> Self {
        Self {
            pending: Arc::clone(&self.pending),
        }
    }
}

impl<K, V> Default for ResponseScript<K, V> {
    fn default() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K, V> ResponseScript<K, V>
where
    K: Eq + Hash,
{
    /// Create an empty script
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the next response for `key`
    ///
    /// Responses for the same key are handed out in registration order.
    pub fn expect(&self, key: K) -> Responder<V> {
        let (tx, rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_default()
            .push_back(rx);
        Responder(tx)
    }

    /// Wait for the scripted response to `key`
    ///
    /// Returns `None` when nothing was registered for `key` or the
    /// responder was dropped without answering.
    pub async fn next_response(&self, key: &K) -> Option<V> {
        let receiver = self.take(key)?;
        receiver.await.ok()
    }

    /// Number of registered responses not yet claimed by a request
    #[must_use]
    pub fn unclaimed(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(VecDeque::len)
            .sum()
    }

    fn take(&self, key: &K) -> Option<oneshot::Receiver<V>> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let queue = pending.get_mut(key)?;
        let receiver = queue.pop_front();
        if queue.is_empty() {
            pending.remove(key);
        }
        receiver
    }
}

/// The test's end of one scripted response
#[derive(Debug)]
pub struct Responder<V>(oneshot::Sender<V>);

impl<V> Responder<V> {
    /// Settle the request with `value`
    ///
    /// Returns `false` if the waiting request was already dropped.
    pub fn respond(self, value: V) -> bool {
        self.0.send(value).is_ok()
    }
}
