//! Local event ledger.
//!
//! The ledger is the authoritative local record of every voting event: its
//! options, tallies and the set of users who have voted. It validates event
//! definitions, enforces one vote per user per event and exposes the
//! read-only views handed to voters and organizers.
//!
//! Persistence is delegated to any [`tally_store::EventStore`]; the store
//! guarantees that a vote commit is a single atomic read-modify-write.

pub mod definition;
pub mod error;
pub mod ledger;
pub mod views;

pub use definition::{EventDefinition, ValidationError};
pub use error::LedgerError;
pub use ledger::Ledger;
pub use views::{EventDetails, EventStats, OptionStats, OptionSummary};
