//! The ledger facade over an [`EventStore`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tally_store::{CommittedVote, EventRecord, EventStore, OptionTally, StoreError};
use tally_types::{Clock, EventCode, SystemClock, TxHash, UserId, VotingPolicy};

use crate::{EventDefinition, EventDetails, EventStats, LedgerError};

/// Authoritative local record of events, tallies and voters.
///
/// Cheap to clone; clones share the same store.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn EventStore>,
    clock: Arc<dyn Clock>,
}

impl Ledger {
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn EventStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Validate a definition without touching storage.
    ///
    /// Also fails with [`LedgerError::DuplicateEventCode`] when the code is
    /// already taken, so callers can refuse before paying for a remote call.
    pub fn validate(&self, definition: &EventDefinition) -> Result<VotingPolicy, LedgerError> {
        let policy = definition.validate()?;
        match self.store.get_event(&definition.code) {
            Ok(_) => Err(LedgerError::DuplicateEventCode(definition.code.clone())),
            Err(StoreError::NotFound(_)) => Ok(policy),
            Err(e) => Err(LedgerError::Persistence(e)),
        }
    }

    /// Persist a new event with zero tallies and no voters.
    pub fn create_event(
        &self,
        definition: &EventDefinition,
        creation_tx: Option<TxHash>,
    ) -> Result<EventRecord, LedgerError> {
        let policy = definition.validate()?;
        let options = definition
            .option_names
            .iter()
            .enumerate()
            .map(|(i, name)| OptionTally {
                name: name.clone(),
                image: definition.option_images.get(i).cloned(),
                tally: 0,
            })
            .collect();

        let record = EventRecord {
            code: definition.code.clone(),
            created_by: definition.created_by.clone(),
            title: definition.title.clone(),
            description: definition.description.clone(),
            created_at: self.clock.now(),
            policy,
            options,
            voted_users: BTreeSet::new(),
            creation_tx,
            commits: BTreeMap::new(),
        };

        self.store.insert_event(&record).map_err(|e| match e {
            StoreError::Duplicate(_) => LedgerError::DuplicateEventCode(record.code.clone()),
            other => LedgerError::Persistence(other),
        })?;

        tracing::info!(
            code = %record.code,
            voting_type = %record.voting_type(),
            options = record.options.len(),
            "event created"
        );
        Ok(record)
    }

    pub fn get_by_code(&self, code: &EventCode) -> Result<EventRecord, LedgerError> {
        self.store
            .get_event(code)
            .map_err(|e| LedgerError::from_store(e, code, None))
    }

    pub fn has_voted(&self, code: &EventCode, user: &UserId) -> Result<bool, LedgerError> {
        self.store
            .has_voted(code, user)
            .map_err(|e| LedgerError::from_store(e, code, Some(user)))
    }

    /// Apply a vote with no remote receipt.
    pub fn record_vote(
        &self,
        code: &EventCode,
        user: &UserId,
        option_index: usize,
    ) -> Result<EventRecord, LedgerError> {
        let committed = self
            .store
            .record_vote(code, user, option_index, None)
            .map_err(|e| LedgerError::from_store(e, code, Some(user)))?;
        tracing::debug!(%code, %user, option_index, "vote recorded");
        Ok(committed.record)
    }

    /// Apply a vote confirmed remotely by `receipt`.
    ///
    /// Replaying the same receipt for the same user is a no-op reported as
    /// [`tally_store::VoteCommit::Replayed`].
    pub fn commit_vote(
        &self,
        code: &EventCode,
        user: &UserId,
        option_index: usize,
        receipt: &TxHash,
    ) -> Result<CommittedVote, LedgerError> {
        let committed = self
            .store
            .record_vote(code, user, option_index, Some(receipt))
            .map_err(|e| LedgerError::from_store(e, code, Some(user)))?;
        tracing::debug!(%code, %user, option_index, tx_hash = %receipt, commit = ?committed.commit, "vote committed");
        Ok(committed)
    }

    pub fn event_details(&self, code: &EventCode) -> Result<EventDetails, LedgerError> {
        Ok(EventDetails::from(&self.get_by_code(code)?))
    }

    pub fn event_stats(&self, code: &EventCode) -> Result<EventStats, LedgerError> {
        Ok(EventStats::from(&self.get_by_code(code)?))
    }

    pub fn list_codes(&self) -> Result<Vec<EventCode>, LedgerError> {
        self.store.list_codes().map_err(LedgerError::Persistence)
    }

    pub fn event_count(&self) -> Result<u64, LedgerError> {
        self.store.event_count().map_err(LedgerError::Persistence)
    }
}
