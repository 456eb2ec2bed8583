use tally_store::StoreError;
use tally_types::{EventCode, UserId};
use thiserror::Error;

use crate::ValidationError;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid event definition: {0}")]
    Validation(#[from] ValidationError),

    #[error("event code {0} is already in use")]
    DuplicateEventCode(EventCode),

    #[error("event {0} not found")]
    NotFound(EventCode),

    #[error("option index {index} out of range ({options} options)")]
    InvalidOption { index: usize, options: usize },

    #[error("user {user} has already voted on event {code}")]
    AlreadyVoted { code: EventCode, user: UserId },

    #[error("persistence failure: {0}")]
    Persistence(StoreError),
}

impl LedgerError {
    /// Map a store error raised while operating on `code` (and `user`, for votes).
    pub(crate) fn from_store(err: StoreError, code: &EventCode, user: Option<&UserId>) -> Self {
        match (err, user) {
            (StoreError::NotFound(_), _) => LedgerError::NotFound(code.clone()),
            (StoreError::InvalidOption { index, options }, _) => {
                LedgerError::InvalidOption { index, options }
            }
            (StoreError::AlreadyVoted(_), Some(user)) => LedgerError::AlreadyVoted {
                code: code.clone(),
                user: user.clone(),
            },
            (other, _) => LedgerError::Persistence(other),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::Validation(_) => "validation",
            LedgerError::DuplicateEventCode(_) => "duplicate_event_code",
            LedgerError::NotFound(_) => "not_found",
            LedgerError::InvalidOption { .. } => "invalid_option",
            LedgerError::AlreadyVoted { .. } => "already_voted",
            LedgerError::Persistence(_) => "persistence",
        }
    }
}
