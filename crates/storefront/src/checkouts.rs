//! Open checkout wizards, one slot per browser session.
//!
//! The wizard does not live in the tower session record: that record is
//! loaded once per request and written back whole when the request ends,
//! so two overlapping requests would each see their own copy and the last
//! one to finish would win. Each slot here is a mutex that a checkout
//! handler holds for its whole run, including the API calls it makes. A
//! close that arrives while `POST /orders` is in flight waits, then finds
//! the new draft and cancels it.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tower_sessions::session::Id;
use uuid::Uuid;

use terroir_core::CheckoutSession;

/// Slots idle this long are dropped with whatever they held.
const SLOT_IDLE: Duration = Duration::from_secs(60 * 60 * 24);

const MAX_SLOTS: u64 = 100_000;

/// Open wizards keyed by session id.
#[derive(Clone)]
pub struct CheckoutStore {
    slots: Cache<Id, Arc<Mutex<Option<CheckoutSession>>>>,
}

impl Default for CheckoutStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckoutStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Cache::builder()
                .max_capacity(MAX_SLOTS)
                .time_to_idle(SLOT_IDLE)
                .build(),
        }
    }

    /// Lock the slot of a session, waiting for any other checkout request
    /// of the same session to finish.
    pub async fn lock(&self, session_id: Id) -> CheckoutSlot {
        let slot = self
            .slots
            .get_with(session_id, async { Arc::new(Mutex::new(None)) })
            .await;
        CheckoutSlot {
            guard: slot.lock_owned().await,
        }
    }

    /// Forget a session's wizard, e.g. at logout.
    pub async fn forget(&self, session_id: Id) {
        self.slots.invalidate(&session_id).await;
    }
}

/// Exclusive access to one session's wizard until dropped.
pub struct CheckoutSlot {
    guard: OwnedMutexGuard<Option<CheckoutSession>>,
}

impl CheckoutSlot {
    /// The open wizard, if `checkout_id` names it.
    pub fn current(&mut self, checkout_id: Option<Uuid>) -> Option<&mut CheckoutSession> {
        let id = checkout_id?;
        self.guard.as_mut().filter(|checkout| checkout.is_current(id))
    }

    /// Install a new wizard, returning the one it replaces.
    pub fn replace(&mut self, checkout: CheckoutSession) -> Option<CheckoutSession> {
        self.guard.replace(checkout)
    }

    /// Close the wizard, returning it.
    pub fn clear(&mut self) -> Option<CheckoutSession> {
        self.guard.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terroir_core::Cart;

    #[tokio::test]
    async fn test_slot_matches_only_current_id() {
        let store = CheckoutStore::new();
        let session = Id::default();

        let mut slot = store.lock(session).await;
        assert!(slot.current(None).is_none());
        let checkout = CheckoutSession::open(&Cart::default());
        let id = checkout.id();
        slot.replace(checkout);
        assert!(slot.current(Some(id)).is_some());
        assert!(slot.current(Some(Uuid::new_v4())).is_none());
        assert!(slot.current(None).is_none());
    }

    #[tokio::test]
    async fn test_state_survives_across_locks() {
        let store = CheckoutStore::new();
        let session = Id::default();
        let checkout = CheckoutSession::open(&Cart::default());
        let id = checkout.id();

        store.lock(session).await.replace(checkout);
        assert!(store.lock(session).await.current(Some(id)).is_some());

        store.lock(session).await.clear();
        assert!(store.lock(session).await.current(Some(id)).is_none());
    }

    #[tokio::test]
    async fn test_second_lock_waits_for_first() {
        let store = CheckoutStore::new();
        let session = Id::default();
        let checkout = CheckoutSession::open(&Cart::default());
        let id = checkout.id();

        let mut first = store.lock(session).await;
        let waiter = {
            let store = store.clone();
            tokio::spawn(async move { store.lock(session).await.current(Some(id)).is_some() })
        };
        tokio::task::yield_now().await;
        first.replace(checkout);
        drop(first);

        assert!(waiter.await.unwrap_or(false));
    }

    #[tokio::test]
    async fn test_forget_drops_slot() {
        let store = CheckoutStore::new();
        let session = Id::default();
        let checkout = CheckoutSession::open(&Cart::default());
        let id = checkout.id();

        store.lock(session).await.replace(checkout);
        store.forget(session).await;
        assert!(store.lock(session).await.current(Some(id)).is_none());
    }
}
