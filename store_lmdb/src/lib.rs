//! LMDB storage backend for the tally engine.
//!
//! Implements [`tally_store::EventStore`] using the `heed` LMDB bindings.
//! Event records live in the `events` database keyed by event code; the
//! `meta` database holds the schema version.
//!
//! LMDB admits a single writer at a time, so the read-modify-write in
//! [`LmdbEventStore::record_vote`] is atomic across threads and processes
//! sharing the environment.

pub mod environment;
pub mod error;
pub mod event;
pub mod meta;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use event::LmdbEventStore;
pub use meta::LmdbMetaStore;
