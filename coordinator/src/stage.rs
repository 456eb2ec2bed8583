//! Lifecycle of a single vote attempt.

use serde::Serialize;
use std::fmt;

/// Where a vote attempt currently stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteStage {
    Received,
    Eligible,
    /// Submitted to the remote ledger, not yet confirmed. Local state untouched.
    Uncommitted,
    Confirmed,
    Committed,
    Rejected,
    RemoteFailed,
}

impl VoteStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteStage::Received => "received",
            VoteStage::Eligible => "eligible",
            VoteStage::Uncommitted => "uncommitted",
            VoteStage::Confirmed => "confirmed",
            VoteStage::Committed => "committed",
            VoteStage::Rejected => "rejected",
            VoteStage::RemoteFailed => "remote_failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            VoteStage::Committed | VoteStage::Rejected | VoteStage::RemoteFailed
        )
    }

    /// Whether `next` is a legal successor of `self`.
    ///
    /// `Eligible -> Committed` is the off-chain path, which has no remote leg.
    /// `Confirmed -> Rejected` is a local commit failure after the remote
    /// ledger already counted the vote.
    pub fn can_advance_to(&self, next: VoteStage) -> bool {
        use VoteStage::*;
        matches!(
            (self, next),
            (Received, Eligible)
                | (Received, Rejected)
                | (Eligible, Uncommitted)
                | (Eligible, Committed)
                | (Eligible, Rejected)
                | (Uncommitted, Confirmed)
                | (Uncommitted, RemoteFailed)
                | (Confirmed, Committed)
                | (Confirmed, Rejected)
        )
    }
}

impl fmt::Display for VoteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks and traces the stage of one attempt.
#[derive(Debug)]
pub(crate) struct StageTracker {
    stage: VoteStage,
}

impl StageTracker {
    pub(crate) fn new() -> Self {
        Self {
            stage: VoteStage::Received,
        }
    }

    pub(crate) fn current(&self) -> VoteStage {
        self.stage
    }

    pub(crate) fn advance(&mut self, next: VoteStage) {
        let legal = self.stage.can_advance_to(next);
        debug_assert!(legal, "illegal vote stage transition {} -> {}", self.stage, next);
        if !legal {
            tracing::error!(from = %self.stage, to = %next, "illegal vote stage transition");
        }
        tracing::debug!(from = %self.stage, to = %next, "vote stage");
        self.stage = next;
    }

    /// Move to `Rejected` and hand `err` back for `map_err`.
    pub(crate) fn reject<E>(&mut self, err: E) -> E {
        self.advance(VoteStage::Rejected);
        err
    }
}
