//! Per-(event, user) attempt queue.
//!
//! Concurrent attempts by the same user on the same event must not both
//! reach the remote ledger. Each attempt waits for the slot; once it holds
//! it, it re-checks the ledger, so a duplicate queued behind a successful
//! vote sees `AlreadyVoted` and one queued behind a failed vote proceeds.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tally_types::{EventCode, UserId};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Key = (EventCode, UserId);
type Slot = Arc<AsyncMutex<()>>;

#[derive(Debug, Default)]
pub struct InFlight {
    slots: Mutex<HashMap<Key, Slot>>,
}

/// Held for the duration of one attempt; frees the slot on drop.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    owner: &'a InFlight,
    key: Key,
    slot: Slot,
    _held: OwnedMutexGuard<()>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other attempt holds `(code, user)`, then claim it.
    pub async fn acquire(&self, code: &EventCode, user: &UserId) -> InFlightGuard<'_> {
        let key = (code.clone(), user.clone());
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(key.clone()).or_default())
        };
        let held = Arc::clone(&slot).lock_owned().await;
        InFlightGuard {
            owner: self,
            key,
            slot,
            _held: held,
        }
    }

    /// Number of pairs with an attempt running or queued.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut slots = self
            .owner
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // map entry + `slot` + the lock guard; anything above that is a waiter
        if Arc::strong_count(&self.slot) <= 3 {
            slots.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn pair() -> (EventCode, UserId, UserId) {
        (
            EventCode::new("evt").unwrap(),
            UserId::new("alice").unwrap(),
            UserId::new("bob").unwrap(),
        )
    }

    #[tokio::test]
    async fn distinct_pairs_do_not_block() {
        let inflight = InFlight::new();
        let (code, alice, bob) = pair();

        let _a = inflight.acquire(&code, &alice).await;
        let b = tokio::time::timeout(Duration::from_millis(50), inflight.acquire(&code, &bob))
            .await
            .expect("bob must not wait on alice");
        assert_eq!(inflight.len(), 2);
        drop(b);
        assert_eq!(inflight.len(), 1);
    }

    #[tokio::test]
    async fn acquire_waits_for_holder() {
        let inflight = Arc::new(InFlight::new());
        let (code, alice, _) = pair();

        let guard = inflight.acquire(&code, &alice).await;
        let waiter = {
            let inflight = Arc::clone(&inflight);
            let (code, alice) = (code.clone(), alice.clone());
            tokio::spawn(async move {
                let _g = inflight.acquire(&code, &alice).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        drop(guard);
        assert_eq!(inflight.len(), 1);

        waiter.await.unwrap();
        assert!(inflight.is_empty());
    }
}
