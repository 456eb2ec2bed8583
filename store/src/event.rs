//! Event record storage.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tally_types::{EventCode, Timestamp, TxHash, UserId, VotingPolicy, VotingType};

use crate::StoreError;

/// One votable option and its local tally.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptionTally {
    pub name: String,
    pub image: Option<String>,
    pub tally: u64,
}

/// The authoritative local record of a voting event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub code: EventCode,
    pub created_by: UserId,
    pub title: Option<String>,
    pub description: Option<String>,
    pub created_at: Timestamp,
    pub policy: VotingPolicy,
    /// Fixed at creation; only the tallies change afterwards.
    pub options: Vec<OptionTally>,
    /// Append-only set of users whose vote has been committed.
    pub voted_users: BTreeSet<UserId>,
    /// Remote transaction that created the event, if the event is chain-backed.
    pub creation_tx: Option<TxHash>,
    /// Commit journal: remote vote receipt -> voter, used to make commits replayable.
    pub commits: BTreeMap<TxHash, UserId>,
}

/// Outcome of applying a vote to a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteCommit {
    /// Tally incremented and voter inserted.
    Applied,
    /// The receipt was already committed for this voter; nothing changed.
    Replayed,
}

/// A vote commit together with the record as it stands afterwards.
#[derive(Clone, Debug)]
pub struct CommittedVote {
    pub record: EventRecord,
    pub commit: VoteCommit,
}

impl EventRecord {
    pub fn voting_type(&self) -> VotingType {
        self.policy.voting_type()
    }

    pub fn has_voted(&self, user: &UserId) -> bool {
        self.voted_users.contains(user)
    }

    pub fn option_index(&self, name: &str) -> Option<usize> {
        self.options.iter().position(|o| o.name == name)
    }

    pub fn total_votes(&self) -> u64 {
        self.options.iter().map(|o| o.tally).sum()
    }

    pub fn tallies(&self) -> Vec<u64> {
        self.options.iter().map(|o| o.tally).collect()
    }

    /// Apply one vote: increment the chosen tally and insert the voter.
    ///
    /// When `receipt` is given and already journaled for the same voter the
    /// call is a no-op returning [`VoteCommit::Replayed`]. On any error the
    /// record is left unchanged.
    pub fn apply_vote(
        &mut self,
        user: &UserId,
        option_index: usize,
        receipt: Option<&TxHash>,
    ) -> Result<VoteCommit, StoreError> {
        if let Some(receipt) = receipt {
            if let Some(owner) = self.commits.get(receipt) {
                if owner == user {
                    return Ok(VoteCommit::Replayed);
                }
                return Err(StoreError::Duplicate(format!(
                    "receipt {receipt} already committed for another voter"
                )));
            }
        }

        let options = self.options.len();
        let option = self
            .options
            .get_mut(option_index)
            .ok_or(StoreError::InvalidOption {
                index: option_index,
                options,
            })?;

        if self.voted_users.contains(user) {
            return Err(StoreError::AlreadyVoted(user.to_string()));
        }

        option.tally = option.tally.checked_add(1).ok_or_else(|| {
            StoreError::Corruption(format!("tally overflow on option {option_index}"))
        })?;
        self.voted_users.insert(user.clone());
        if let Some(receipt) = receipt {
            self.commits.insert(*receipt, user.clone());
        }
        Ok(VoteCommit::Applied)
    }
}

/// Trait for persisting voting events.
///
/// Implementations must make [`EventStore::record_vote`] an atomic
/// read-modify-write of a single event record: concurrent calls for the same
/// `(code, user)` pair yield exactly one success, and concurrent calls for
/// different users never lose an increment.
pub trait EventStore: Send + Sync {
    /// Insert a new event. Fails with [`StoreError::Duplicate`] if the code exists.
    fn insert_event(&self, record: &EventRecord) -> Result<(), StoreError>;

    /// Get an event by code.
    fn get_event(&self, code: &EventCode) -> Result<EventRecord, StoreError>;

    /// Atomically apply a vote to the stored record (see [`EventRecord::apply_vote`]).
    fn record_vote(
        &self,
        code: &EventCode,
        user: &UserId,
        option_index: usize,
        receipt: Option<&TxHash>,
    ) -> Result<CommittedVote, StoreError>;

    /// Number of stored events.
    fn event_count(&self) -> Result<u64, StoreError>;

    /// All stored event codes, in key order.
    fn list_codes(&self) -> Result<Vec<EventCode>, StoreError>;

    /// Membership test against the event's voter set.
    fn has_voted(&self, code: &EventCode, user: &UserId) -> Result<bool, StoreError> {
        Ok(self.get_event(code)?.has_voted(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_types::{GeoFence, GeoPoint};

    fn record() -> EventRecord {
        EventRecord {
            code: EventCode::new("evt").unwrap(),
            created_by: UserId::new("organizer").unwrap(),
            title: None,
            description: None,
            created_at: Timestamp::new(1_000),
            policy: VotingPolicy::Standard {
                fence: GeoFence::new(GeoPoint::new(0.0, 0.0), 100.0),
            },
            options: vec![
                OptionTally {
                    name: "red".into(),
                    image: None,
                    tally: 0,
                },
                OptionTally {
                    name: "blue".into(),
                    image: Some("blue.png".into()),
                    tally: 0,
                },
            ],
            voted_users: BTreeSet::new(),
            creation_tx: None,
            commits: BTreeMap::new(),
        }
    }

    fn user(name: &str) -> UserId {
        UserId::new(name).unwrap()
    }

    #[test]
    fn apply_vote_increments_and_records_voter() {
        let mut rec = record();
        assert_eq!(rec.apply_vote(&user("alice"), 1, None).unwrap(), VoteCommit::Applied);
        assert_eq!(rec.tallies(), vec![0, 1]);
        assert!(rec.has_voted(&user("alice")));
    }

    #[test]
    fn second_vote_is_rejected_without_change() {
        let mut rec = record();
        rec.apply_vote(&user("alice"), 0, None).unwrap();
        let before = rec.clone();
        let err = rec.apply_vote(&user("alice"), 1, None).unwrap_err();
        assert!(matches!(err, StoreError::AlreadyVoted(_)));
        assert_eq!(rec, before);
    }

    #[test]
    fn invalid_option_is_rejected_without_change() {
        let mut rec = record();
        let err = rec.apply_vote(&user("alice"), 2, None).unwrap_err();
        assert!(matches!(err, StoreError::InvalidOption { index: 2, options: 2 }));
        assert_eq!(rec.total_votes(), 0);
        assert!(rec.voted_users.is_empty());
    }

    #[test]
    fn replayed_receipt_does_not_double_count() {
        let mut rec = record();
        let receipt = TxHash::new([7; 32]);
        rec.apply_vote(&user("alice"), 0, Some(&receipt)).unwrap();
        let again = rec.apply_vote(&user("alice"), 0, Some(&receipt)).unwrap();
        assert_eq!(again, VoteCommit::Replayed);
        assert_eq!(rec.total_votes(), 1);
    }

    #[test]
    fn receipt_owned_by_another_voter_is_rejected() {
        let mut rec = record();
        let receipt = TxHash::new([7; 32]);
        rec.apply_vote(&user("alice"), 0, Some(&receipt)).unwrap();
        let err = rec.apply_vote(&user("bob"), 0, Some(&receipt)).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));
        assert!(!rec.has_voted(&user("bob")));
    }

    #[test]
    fn option_lookup_by_name() {
        let rec = record();
        assert_eq!(rec.option_index("blue"), Some(1));
        assert_eq!(rec.option_index("green"), None);
    }
}
