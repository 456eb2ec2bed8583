//! Confirmation artifacts and remote score sheets.

use serde::{Deserialize, Serialize};
use tally_types::TxHash;

/// Returned once a remote transaction is finalized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
}

/// Remote tallies for one event, in option order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSheet {
    pub names: Vec<String>,
    pub scores: Vec<u64>,
    pub images: Vec<String>,
}

impl ScoreSheet {
    pub fn score_of(&self, name: &str) -> Option<u64> {
        self.names
            .iter()
            .position(|n| n == name)
            .and_then(|i| self.scores.get(i).copied())
    }

    pub fn total(&self) -> u64 {
        self.scores.iter().sum()
    }
}
