//! Per-entity serialization of read-modify-write operations.
//!
//! Mutations of composite values (a product's ratings and their average, a cart's
//! lines, an order's status, a category and its children) take the lock for the
//! entity they change before opening their database transaction, and hold it until
//! the transaction commits. Two requests touching different entities never wait on
//! each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::trace;

/// Identifies the entity a lock protects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockKey {
    /// A product: its ratings, average, fields, and deletion
    Product(i64),
    /// A user's cart, keyed by the user id (one cart per user)
    Cart(i64),
    /// An order's status and payment status
    Order(i64),
    /// A category together with its subcategories
    Category(i64),
    /// A user's account-level state (store creation, role)
    User(i64),
}

/// Registry of async mutexes keyed by entity.
#[derive(Debug, Default)]
pub struct EntityLocks {
    slots: Mutex<HashMap<LockKey, Arc<AsyncMutex<()>>>>,
}

impl EntityLocks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `key`. Access ends when the guard drops.
    pub async fn acquire(&self, key: LockKey) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            // A slot referenced only by the map has no holder and no waiter.
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            Arc::clone(slots.entry(key).or_default())
        };
        trace!(?key, "Waiting for entity lock");
        slot.lock_owned().await
    }

    /// Number of slots currently tracked (held or awaited).
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
