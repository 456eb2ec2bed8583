//! Vote eligibility for the tally engine.
//!
//! - [`geo`]: great-circle distance and radius checks (pure functions).
//! - [`gate`]: per-attempt policy evaluation for `standard` (geofenced) and
//!   `secure` (connection-based) events.
//!
//! Nothing in this crate performs I/O; every check is deterministic for
//! identical inputs.

pub mod gate;
pub mod geo;

pub use gate::{check_eligibility, AttemptContext, DenyReason, Eligibility};
pub use geo::{distance_m, within_radius, EARTH_RADIUS_M};
