use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("option index {index} out of range ({options} options)")]
    InvalidOption { index: usize, options: usize },

    #[error("user {0} has already voted on this event")]
    AlreadyVoted(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("record is corrupted: {0}")]
    Corruption(String),
}
