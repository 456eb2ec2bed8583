//! Fundamental types for the tally voting engine.
//!
//! This crate defines the identifiers and value types shared by every other
//! crate in the workspace: event codes, user ids, transaction hashes,
//! coordinates, voting policies and timestamps.

pub mod code;
pub mod error;
pub mod geo;
pub mod hash;
pub mod policy;
pub mod time;
pub mod user;

pub use code::EventCode;
pub use error::TypeError;
pub use geo::{GeoFence, GeoPoint};
pub use hash::TxHash;
pub use policy::{VotingPolicy, VotingType};
pub use time::{Clock, SystemClock, Timestamp};
pub use user::UserId;
