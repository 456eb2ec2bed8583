//! LMDB implementation of EventStore.
//!
//! Key: event code bytes. Value: bincode-encoded [`EventRecord`].

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use tally_store::{CommittedVote, EventRecord, EventStore, StoreError, VoteCommit};
use tally_types::{EventCode, TxHash, UserId};

use crate::LmdbError;

pub struct LmdbEventStore {
    pub(crate) env: Arc<Env>,
    pub(crate) events_db: Database<Bytes, Bytes>,
}

fn decode(bytes: &[u8]) -> Result<EventRecord, LmdbError> {
    Ok(bincode::deserialize(bytes)?)
}

impl EventStore for LmdbEventStore {
    fn insert_event(&self, record: &EventRecord) -> Result<(), StoreError> {
        let key = record.code.as_str().as_bytes();
        let bytes = bincode::serialize(record).map_err(LmdbError::from)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        if self
            .events_db
            .get(&wtxn, key)
            .map_err(LmdbError::from)?
            .is_some()
        {
            return Err(StoreError::Duplicate(record.code.to_string()));
        }
        self.events_db
            .put(&mut wtxn, key, &bytes)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_event(&self, code: &EventCode) -> Result<EventRecord, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .events_db
            .get(&rtxn, code.as_str().as_bytes())
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound(format!("event '{code}'")))?;
        Ok(decode(val)?)
    }

    fn record_vote(
        &self,
        code: &EventCode,
        user: &UserId,
        option_index: usize,
        receipt: Option<&TxHash>,
    ) -> Result<CommittedVote, StoreError> {
        let key = code.as_str().as_bytes();
        // The write transaction is held across read, check and write; dropping
        // it on any error path aborts without touching the record.
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let mut record = match self.events_db.get(&wtxn, key).map_err(LmdbError::from)? {
            Some(bytes) => decode(bytes)?,
            None => return Err(StoreError::NotFound(format!("event '{code}'"))),
        };

        let commit = record.apply_vote(user, option_index, receipt)?;
        if commit == VoteCommit::Applied {
            let bytes = bincode::serialize(&record).map_err(LmdbError::from)?;
            self.events_db
                .put(&mut wtxn, key, &bytes)
                .map_err(LmdbError::from)?;
            wtxn.commit().map_err(LmdbError::from)?;
        }
        Ok(CommittedVote { record, commit })
    }

    fn event_count(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        Ok(self.events_db.len(&rtxn).map_err(LmdbError::from)?)
    }

    fn list_codes(&self) -> Result<Vec<EventCode>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut codes = Vec::new();
        for entry in self.events_db.iter(&rtxn).map_err(LmdbError::from)? {
            let (key, _) = entry.map_err(LmdbError::from)?;
            let raw = std::str::from_utf8(key)
                .map_err(|e| StoreError::Corruption(format!("non-utf8 event key: {e}")))?;
            let code = EventCode::new(raw)
                .map_err(|e| StoreError::Corruption(format!("bad event key: {e}")))?;
            codes.push(code);
        }
        Ok(codes)
    }

    fn has_voted(&self, code: &EventCode, user: &UserId) -> Result<bool, StoreError> {
        Ok(self.get_event(code)?.has_voted(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{LmdbEnvironment, DEFAULT_MAP_SIZE};
    use std::collections::{BTreeMap, BTreeSet};
    use std::thread;
    use tally_store::OptionTally;
    use tally_types::{GeoFence, GeoPoint, Timestamp, VotingPolicy};

    fn temp_env() -> (tempfile::TempDir, LmdbEnvironment) {
        let dir = tempfile::tempdir().expect("temp dir");
        let env = LmdbEnvironment::open(dir.path(), DEFAULT_MAP_SIZE).expect("open env");
        (dir, env)
    }

    fn record(code: &str, options: usize) -> EventRecord {
        EventRecord {
            code: EventCode::new(code).unwrap(),
            created_by: UserId::new("organizer").unwrap(),
            title: Some("Lunch".into()),
            description: None,
            created_at: Timestamp::new(42),
            policy: VotingPolicy::Standard {
                fence: GeoFence::new(GeoPoint::new(0.0, 0.0), 100.0),
            },
            options: (0..options)
                .map(|i| OptionTally {
                    name: format!("option-{i}"),
                    image: None,
                    tally: 0,
                })
                .collect(),
            voted_users: BTreeSet::new(),
            creation_tx: Some(TxHash::new([1; 32])),
            commits: BTreeMap::new(),
        }
    }

    fn user(i: usize) -> UserId {
        UserId::new(format!("user-{i}")).unwrap()
    }

    #[test]
    fn insert_and_get_round_trip() {
        let (_dir, env) = temp_env();
        let store = env.event_store();
        let rec = record("lunch", 2);
        store.insert_event(&rec).unwrap();
        assert_eq!(store.get_event(&rec.code).unwrap(), rec);
        assert_eq!(store.event_count().unwrap(), 1);
        assert_eq!(store.list_codes().unwrap(), vec![rec.code.clone()]);
    }

    #[test]
    fn duplicate_code_is_rejected() {
        let (_dir, env) = temp_env();
        let store = env.event_store();
        store.insert_event(&record("lunch", 2)).unwrap();
        let err = store.insert_event(&record("lunch", 3)).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
        assert_eq!(store.get_event(&EventCode::new("lunch").unwrap()).unwrap().options.len(), 2);
    }

    #[test]
    fn missing_event_is_not_found() {
        let (_dir, env) = temp_env();
        let store = env.event_store();
        let err = store
            .get_event(&EventCode::new("nope").unwrap())
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        let err = store
            .record_vote(&EventCode::new("nope").unwrap(), &user(0), 0, None)
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn rejected_vote_leaves_record_untouched() {
        let (_dir, env) = temp_env();
        let store = env.event_store();
        let rec = record("lunch", 2);
        store.insert_event(&rec).unwrap();
        store.record_vote(&rec.code, &user(0), 0, None).unwrap();
        let err = store.record_vote(&rec.code, &user(0), 1, None).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyVoted(_)));
        let stored = store.get_event(&rec.code).unwrap();
        assert_eq!(stored.tallies(), vec![1, 0]);
        assert!(store.has_voted(&rec.code, &user(0)).unwrap());
        assert!(!store.has_voted(&rec.code, &user(1)).unwrap());
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let code = EventCode::new("persist").unwrap();
        {
            let env = LmdbEnvironment::open(dir.path(), DEFAULT_MAP_SIZE).unwrap();
            let store = env.event_store();
            store.insert_event(&record("persist", 2)).unwrap();
            store.record_vote(&code, &user(0), 1, None).unwrap();
        }
        let env = LmdbEnvironment::open(dir.path(), DEFAULT_MAP_SIZE).unwrap();
        let stored = env.event_store().get_event(&code).unwrap();
        assert_eq!(stored.tallies(), vec![0, 1]);
        assert_eq!(env.meta_store().schema_version().unwrap(), 1);
    }

    #[test]
    fn concurrent_votes_by_same_user_admit_exactly_one() {
        let (_dir, env) = temp_env();
        let store = Arc::new(env.event_store());
        let rec = record("race", 2);
        store.insert_event(&rec).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                let code = rec.code.clone();
                thread::spawn(move || store.record_vote(&code, &user(0), i % 2, None))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let ok = results.iter().filter(|r| r.is_ok()).count();
        let already = results
            .iter()
            .filter(|r| matches!(r, Err(StoreError::AlreadyVoted(_))))
            .count();
        assert_eq!(ok, 1);
        assert_eq!(already, 7);
        assert_eq!(store.get_event(&rec.code).unwrap().total_votes(), 1);
    }

    #[test]
    fn concurrent_votes_by_distinct_users_lose_nothing() {
        let (_dir, env) = temp_env();
        let store = Arc::new(env.event_store());
        let rec = record("crowd", 3);
        store.insert_event(&rec).unwrap();

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let store = Arc::clone(&store);
                let code = rec.code.clone();
                thread::spawn(move || store.record_vote(&code, &user(i), i % 3, None))
            })
            .collect();
        for h in handles {
            h.join().unwrap().unwrap();
        }

        let stored = store.get_event(&rec.code).unwrap();
        assert_eq!(stored.total_votes(), 32);
        assert_eq!(stored.voted_users.len(), 32);
    }

    #[test]
    fn replayed_receipt_is_not_rewritten() {
        let (_dir, env) = temp_env();
        let store = env.event_store();
        let rec = record("replay", 2);
        store.insert_event(&rec).unwrap();
        let receipt = TxHash::new([9; 32]);
        let first = store.record_vote(&rec.code, &user(0), 0, Some(&receipt)).unwrap();
        assert_eq!(first.commit, VoteCommit::Applied);
        let second = store.record_vote(&rec.code, &user(0), 0, Some(&receipt)).unwrap();
        assert_eq!(second.commit, VoteCommit::Replayed);
        assert_eq!(store.get_event(&rec.code).unwrap().total_votes(), 1);
    }
}
