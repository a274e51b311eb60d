//! Explicit subscription handles for change notifications.
//!
//! Signal sources (the settings store, the windowing host) hand out a
//! [`SubscriptionId`] per `connect` call. Whoever delivers notifications
//! consults the same [`ConnectionTable`] so nothing is forwarded once the
//! controller has disconnected.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

#[derive(Debug)]
struct Table<T> {
    next_id: u64,
    connections: BTreeMap<SubscriptionId, T>,
}

/// Shared connect/disconnect bookkeeping. Cloning shares the table.
#[derive(Debug)]
pub struct ConnectionTable<T> {
    inner: Arc<Mutex<Table<T>>>,
}

impl<T> Clone for ConnectionTable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for ConnectionTable<T> {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Table {
                next_id: 1,
                connections: BTreeMap::new(),
            })),
        }
    }
}

impl<T: Clone + PartialEq> ConnectionTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&self, topic: T) -> SubscriptionId {
        let mut table = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let id = SubscriptionId(table.next_id);
        table.next_id += 1;
        table.connections.insert(id, topic);
        id
    }

    /// Returns `false` when the id was not connected.
    pub fn disconnect(&self, id: SubscriptionId) -> bool {
        let mut table = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        table.connections.remove(&id).is_some()
    }

    pub fn is_connected(&self, topic: &T) -> bool {
        let table = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        table.connections.values().any(|t| t == topic)
    }

    pub fn len(&self) -> usize {
        let table = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        table.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
