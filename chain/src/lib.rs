//! Bridge to the remote transactional ledger (voting smart contract).
//!
//! The remote ledger keeps an independent tally used for audit. It is slow
//! and fails independently of the local store, so every state-changing call
//! returns only once the transaction is confirmed (or definitively failed).
//!
//! - [`ChainBridge`]: the object-safe async interface the coordinator uses.
//! - [`JsonRpcBridge`]: JSON-RPC 2.0 over HTTP implementation.

pub mod error;
pub mod jsonrpc;
pub mod receipt;

use async_trait::async_trait;
use tally_types::EventCode;

pub use error::ChainError;
pub use jsonrpc::JsonRpcBridge;
pub use receipt::{ScoreSheet, TxReceipt};

/// Request/response access to the remote ledger.
///
/// Constructed once at start-up and shared as `Arc<dyn ChainBridge>`.
#[async_trait]
pub trait ChainBridge: Send + Sync {
    /// Register an event and its options; resolves once confirmed.
    async fn submit_create_event(
        &self,
        code: &EventCode,
        option_names: &[String],
        option_images: &[String],
    ) -> Result<TxReceipt, ChainError>;

    /// Cast one vote for `option_index`; resolves once confirmed.
    async fn submit_vote(
        &self,
        code: &EventCode,
        option_index: usize,
    ) -> Result<TxReceipt, ChainError>;

    /// Read the remote tallies. Independent of the local store.
    async fn fetch_scores(&self, code: &EventCode) -> Result<ScoreSheet, ChainError>;

    /// Human-readable name of this bridge.
    fn name(&self) -> &str;
}
