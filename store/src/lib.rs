//! Event record and abstract storage traits for the tally engine.
//!
//! Every storage backend (LMDB, in-memory for testing) implements
//! [`EventStore`]. The rest of the workspace depends only on the trait.
//!
//! The record's vote transition lives on [`EventRecord`] itself so that every
//! backend applies the same checks inside its own atomic read-modify-write.

pub mod error;
pub mod event;

pub use error::StoreError;
pub use event::{CommittedVote, EventRecord, EventStore, OptionTally, VoteCommit};
