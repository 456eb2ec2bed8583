//! Nullable store — thread-safe in-memory event storage for testing.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use tally_store::{CommittedVote, EventRecord, EventStore, StoreError, VoteCommit};
use tally_types::{EventCode, TxHash, UserId};

/// An in-memory [`EventStore`].
///
/// The whole map sits behind one mutex, so every vote is a single critical
/// section, matching the LMDB backend's one-writer guarantee.
#[derive(Default)]
pub struct NullEventStore {
    events: Mutex<BTreeMap<EventCode, EventRecord>>,
}

impl NullEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<EventCode, EventRecord>>, StoreError> {
        self.events
            .lock()
            .map_err(|_| StoreError::Backend("event map lock poisoned".into()))
    }

    /// Overwrite a record, bypassing the vote checks. For seeding corrupt states.
    pub fn put_raw(&self, record: EventRecord) -> Result<(), StoreError> {
        self.lock()?.insert(record.code.clone(), record);
        Ok(())
    }
}

impl EventStore for NullEventStore {
    fn insert_event(&self, record: &EventRecord) -> Result<(), StoreError> {
        let mut events = self.lock()?;
        if events.contains_key(&record.code) {
            return Err(StoreError::Duplicate(record.code.to_string()));
        }
        events.insert(record.code.clone(), record.clone());
        Ok(())
    }

    fn get_event(&self, code: &EventCode) -> Result<EventRecord, StoreError> {
        self.lock()?
            .get(code)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(code.to_string()))
    }

    fn record_vote(
        &self,
        code: &EventCode,
        user: &UserId,
        option_index: usize,
        receipt: Option<&TxHash>,
    ) -> Result<CommittedVote, StoreError> {
        let mut events = self.lock()?;
        let stored = events
            .get_mut(code)
            .ok_or_else(|| StoreError::NotFound(code.to_string()))?;

        // Apply to a copy so a failed check leaves the stored record untouched.
        let mut record = stored.clone();
        let commit = record.apply_vote(user, option_index, receipt)?;
        if commit == VoteCommit::Applied {
            *stored = record.clone();
        }
        Ok(CommittedVote { record, commit })
    }

    fn event_count(&self) -> Result<u64, StoreError> {
        Ok(self.lock()?.len() as u64)
    }

    fn list_codes(&self) -> Result<Vec<EventCode>, StoreError> {
        Ok(self.lock()?.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use tally_store::OptionTally;
    use tally_types::{Timestamp, VotingPolicy};

    fn record(code: &str) -> EventRecord {
        EventRecord {
            code: EventCode::new(code).unwrap(),
            created_by: UserId::new("organizer").unwrap(),
            title: None,
            description: None,
            created_at: Timestamp::new(0),
            policy: VotingPolicy::Secure { venue: None },
            options: vec![OptionTally {
                name: "yes".into(),
                image: None,
                tally: 0,
            }],
            voted_users: BTreeSet::new(),
            creation_tx: None,
            commits: BTreeMap::new(),
        }
    }

    #[test]
    fn insert_get_and_duplicate() {
        let store = NullEventStore::new();
        store.insert_event(&record("a")).unwrap();
        assert!(matches!(
            store.insert_event(&record("a")),
            Err(StoreError::Duplicate(_))
        ));
        assert_eq!(store.event_count().unwrap(), 1);
        assert_eq!(store.list_codes().unwrap(), vec![EventCode::new("a").unwrap()]);
    }

    #[test]
    fn concurrent_same_user_votes_once() {
        let store = Arc::new(NullEventStore::new());
        store.insert_event(&record("a")).unwrap();
        let code = EventCode::new("a").unwrap();
        let user = UserId::new("alice").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let code = code.clone();
                let user = user.clone();
                std::thread::spawn(move || store.record_vote(&code, &user, 0, None).is_ok())
            })
            .collect();
        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(successes, 1);
        assert_eq!(store.get_event(&code).unwrap().total_votes(), 1);
    }
}
