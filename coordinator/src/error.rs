use tally_chain::ChainError;
use tally_eligibility::DenyReason;
use tally_ledger::{LedgerError, ValidationError};
use tally_types::{EventCode, TxHash, UserId};
use thiserror::Error;

use crate::coordinator::OptionChoice;

/// Why a vote attempt did not end in a committed vote.
#[derive(Debug, Error)]
pub enum VoteError {
    #[error("malformed vote request: {0}")]
    InvalidRequest(String),

    #[error("event {0} not found")]
    NotFound(EventCode),

    #[error("option {choice} does not exist ({options} options)")]
    InvalidOption { choice: OptionChoice, options: usize },

    #[error("not eligible to vote: {0}")]
    EligibilityDenied(DenyReason),

    #[error("user {user} has already voted on event {code}")]
    AlreadyVoted { code: EventCode, user: UserId },

    #[error(transparent)]
    Remote(ChainError),

    /// The remote ledger counted the vote but the local commit failed.
    #[error("vote confirmed remotely in {tx_hash} but not recorded locally: {source}")]
    CommitAfterRemote {
        tx_hash: TxHash,
        #[source]
        source: LedgerError,
    },

    #[error("local ledger failure: {0}")]
    Persistence(LedgerError),
}

impl VoteError {
    /// Stable discriminant for callers and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            VoteError::InvalidRequest(_) => "validation",
            VoteError::NotFound(_) => "not_found",
            VoteError::InvalidOption { .. } => "invalid_option",
            VoteError::EligibilityDenied(_) => "eligibility_denied",
            VoteError::AlreadyVoted { .. } => "already_voted",
            VoteError::Remote(e) => e.kind(),
            VoteError::CommitAfterRemote { .. } => "commit_after_remote",
            VoteError::Persistence(_) => "persistence",
        }
    }

    /// Finer reason for eligibility denials (`out_of_range`, ...).
    pub fn deny_reason(&self) -> Option<&DenyReason> {
        match self {
            VoteError::EligibilityDenied(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, VoteError::Remote(_))
    }

    /// The remote transaction already spent when the local commit failed.
    pub fn remote_applied(&self) -> Option<TxHash> {
        match self {
            VoteError::CommitAfterRemote { tx_hash, .. } => Some(*tx_hash),
            _ => None,
        }
    }

    /// True when the local ledger was left untouched, so an identical retry is safe.
    pub fn is_retryable(&self) -> bool {
        matches!(self, VoteError::Remote(_))
    }

    /// A timed-out submission may still be counted remotely later.
    pub fn may_have_landed(&self) -> bool {
        matches!(self, VoteError::Remote(ChainError::Timeout(_)))
    }
}

impl From<LedgerError> for VoteError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::NotFound(code) => VoteError::NotFound(code),
            LedgerError::InvalidOption { index, options } => VoteError::InvalidOption {
                choice: OptionChoice::Index(index),
                options,
            },
            LedgerError::AlreadyVoted { code, user } => VoteError::AlreadyVoted { code, user },
            other => VoteError::Persistence(other),
        }
    }
}

/// Why an event was not created.
#[derive(Debug, Error)]
pub enum CreateError {
    #[error("invalid event definition: {0}")]
    Validation(#[from] ValidationError),

    #[error("event code {0} is already in use")]
    DuplicateEventCode(EventCode),

    #[error("could not generate an event code: {0}")]
    CodeGeneration(String),

    #[error(transparent)]
    Remote(ChainError),

    /// The remote ledger registered the event but the local record was not written.
    #[error("event registered remotely in {tx_hash} but not recorded locally: {source}")]
    CommitAfterRemote {
        tx_hash: TxHash,
        #[source]
        source: LedgerError,
    },

    #[error("local ledger failure: {0}")]
    Persistence(LedgerError),
}

impl CreateError {
    pub fn kind(&self) -> &'static str {
        match self {
            CreateError::Validation(_) => "validation",
            CreateError::DuplicateEventCode(_) => "duplicate_event_code",
            CreateError::CodeGeneration(_) => "internal",
            CreateError::Remote(e) => e.kind(),
            CreateError::CommitAfterRemote { .. } => "commit_after_remote",
            CreateError::Persistence(_) => "persistence",
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, CreateError::Remote(_))
    }

    pub fn remote_applied(&self) -> Option<TxHash> {
        match self {
            CreateError::CommitAfterRemote { tx_hash, .. } => Some(*tx_hash),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, CreateError::Remote(_))
    }

    pub fn may_have_landed(&self) -> bool {
        matches!(self, CreateError::Remote(ChainError::Timeout(_)))
    }
}

impl From<LedgerError> for CreateError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Validation(v) => CreateError::Validation(v),
            LedgerError::DuplicateEventCode(code) => CreateError::DuplicateEventCode(code),
            other => CreateError::Persistence(other),
        }
    }
}

/// Failures of read-only operations (details, stats, scores, audit).
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("malformed request: {0}")]
    InvalidRequest(String),

    #[error("event {0} not found")]
    NotFound(EventCode),

    #[error("user {user} is not the organizer of event {code}")]
    NotAuthorized { code: EventCode, user: UserId },

    #[error("no remote ledger is configured")]
    NoRemoteLedger,

    #[error(transparent)]
    Remote(ChainError),

    #[error("local ledger failure: {0}")]
    Persistence(LedgerError),
}

impl QueryError {
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::InvalidRequest(_) => "validation",
            QueryError::NotFound(_) => "not_found",
            QueryError::NotAuthorized { .. } => "not_authorized",
            QueryError::NoRemoteLedger => "validation",
            QueryError::Remote(e) => e.kind(),
            QueryError::Persistence(_) => "persistence",
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, QueryError::Remote(_))
    }
}

impl From<LedgerError> for QueryError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::NotFound(code) => QueryError::NotFound(code),
            other => QueryError::Persistence(other),
        }
    }
}

/// Service-level failures outside a single request.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("config error: {0}")]
    Config(String),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn code() -> EventCode {
        EventCode::new("evt").unwrap()
    }

    #[test]
    fn remote_errors_keep_chain_kinds() {
        let timeout = VoteError::Remote(ChainError::Timeout(Duration::from_secs(1)));
        assert_eq!(timeout.kind(), "timeout");
        assert!(timeout.is_remote());
        assert!(timeout.is_retryable());
        assert!(timeout.may_have_landed());

        let offline = VoteError::Remote(ChainError::Submission("refused".into()));
        assert_eq!(offline.kind(), "chain_submission");
        assert!(offline.is_retryable());
        assert!(!offline.may_have_landed());

        let rejected = CreateError::Remote(ChainError::Rejected("reverted".into()));
        assert_eq!(rejected.kind(), "chain_rejected");
        assert!(rejected.is_retryable());
        assert!(!rejected.may_have_landed());
    }

    #[test]
    fn commit_gap_reports_spent_transaction() {
        let tx = TxHash::new([3; 32]);
        let err = VoteError::CommitAfterRemote {
            tx_hash: tx,
            source: LedgerError::NotFound(code()),
        };
        assert_eq!(err.kind(), "commit_after_remote");
        assert_eq!(err.remote_applied(), Some(tx));
        assert!(!err.is_remote());
        assert!(!err.is_retryable());
    }

    #[test]
    fn ledger_errors_map_to_request_errors() {
        let err: VoteError = LedgerError::InvalidOption { index: 4, options: 2 }.into();
        assert_eq!(err.kind(), "invalid_option");
        let err: CreateError = LedgerError::DuplicateEventCode(code()).into();
        assert_eq!(err.kind(), "duplicate_event_code");
        let err: QueryError = LedgerError::NotFound(code()).into();
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn denial_exposes_reason() {
        let err = VoteError::EligibilityDenied(DenyReason::InsecureConnection);
        assert_eq!(err.kind(), "eligibility_denied");
        assert_eq!(err.deny_reason().map(DenyReason::kind), Some("insecure_connection"));
    }
}
