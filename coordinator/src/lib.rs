//! Vote coordination for the tally engine.
//!
//! The [`VoteCoordinator`] sequences every vote through eligibility, the
//! one-vote-per-user check, remote confirmation and the local commit:
//!
//! ```text
//! Received -> Eligible -> Uncommitted -> Confirmed -> Committed
//!     \___________\____________\______________> Rejected / RemoteFailed
//! ```
//!
//! The local ledger is only mutated after the remote ledger has confirmed,
//! so a failed or timed-out remote call never leaves a local trace. A local
//! failure after remote confirmation is reported as a reconciliation gap
//! carrying the spent transaction hash.

pub mod api;
pub mod audit;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod inflight;
pub mod metrics;
pub mod stage;
pub mod tracing_spans;

pub use audit::{AuditReport, OptionDiscrepancy};
pub use config::{ChainConfig, ServiceConfig};
pub use coordinator::{CreatedEvent, OptionChoice, VoteAttempt, VoteCoordinator, VoteOutcome};
pub use error::{CoordinatorError, CreateError, QueryError, VoteError};
pub use metrics::CoordinatorMetrics;
pub use stage::VoteStage;
