use std::time::Duration;

use thiserror::Error;

/// Remote ledger failures. None of these imply a local mutation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("remote submission failed: {0}")]
    Submission(String),

    #[error("remote ledger rejected the transaction: {0}")]
    Rejected(String),

    #[error("remote ledger did not confirm within {0:?}")]
    Timeout(Duration),

    #[error("malformed remote response: {0}")]
    Decode(String),
}

impl ChainError {
    /// Stable discriminant for callers and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ChainError::Submission(_) | ChainError::Decode(_) => "chain_submission",
            ChainError::Rejected(_) => "chain_rejected",
            ChainError::Timeout(_) => "timeout",
        }
    }
}
