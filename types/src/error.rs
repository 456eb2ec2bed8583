//! Parse and construction errors for the fundamental types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("invalid event code: {0}")]
    InvalidEventCode(String),

    #[error("invalid user id: {0}")]
    InvalidUserId(String),

    #[error("invalid transaction hash: {0}")]
    InvalidTxHash(String),

    #[error("unknown voting type: {0}")]
    UnknownVotingType(String),
}
