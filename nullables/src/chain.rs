//! Nullable remote ledger — scripted confirmations for testing.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tally_chain::{ChainBridge, ChainError, ScoreSheet, TxReceipt};
use tally_types::{EventCode, TxHash};

/// How the next submission resolves.
#[derive(Clone, Debug, PartialEq)]
pub enum ChainOutcome {
    /// Confirm immediately.
    Confirm,
    /// Confirm after sleeping for the given duration.
    ConfirmAfter(Duration),
    /// The remote ledger refuses the transaction.
    Reject(String),
    /// The submission never reaches the remote ledger.
    Fail(String),
    /// Never resolves; the caller's timeout has to fire.
    Hang,
}

/// A submission the bridge received, in arrival order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Submission {
    CreateEvent {
        code: EventCode,
        option_names: Vec<String>,
        option_images: Vec<String>,
    },
    Vote {
        code: EventCode,
        option_index: usize,
    },
}

/// An in-memory [`ChainBridge`] with a scriptable outcome queue.
///
/// Confirmed submissions update a remote score sheet, so audits can compare
/// it with the local ledger.
pub struct NullChain {
    script: Mutex<VecDeque<ChainOutcome>>,
    fallback: Mutex<ChainOutcome>,
    submissions: Mutex<Vec<Submission>>,
    sheets: Mutex<BTreeMap<EventCode, ScoreSheet>>,
    next_tx: AtomicU64,
}

fn guard<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl NullChain {
    /// A chain that confirms everything.
    pub fn new() -> Self {
        Self::with_fallback(ChainOutcome::Confirm)
    }

    /// A chain whose unscripted submissions all resolve as `outcome`.
    pub fn with_fallback(outcome: ChainOutcome) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(outcome),
            submissions: Mutex::new(Vec::new()),
            sheets: Mutex::new(BTreeMap::new()),
            next_tx: AtomicU64::new(1),
        }
    }

    /// Queue an outcome for the next unscripted submission.
    pub fn push_outcome(&self, outcome: ChainOutcome) {
        guard(&self.script).push_back(outcome);
    }

    pub fn set_fallback(&self, outcome: ChainOutcome) {
        *guard(&self.fallback) = outcome;
    }

    /// Everything submitted so far, including rejected and failed submissions.
    pub fn submissions(&self) -> Vec<Submission> {
        guard(&self.submissions).clone()
    }

    pub fn vote_submissions(&self) -> usize {
        guard(&self.submissions)
            .iter()
            .filter(|s| matches!(s, Submission::Vote { .. }))
            .count()
    }

    /// Overwrite the remote score sheet for an event.
    pub fn set_scores(&self, code: &EventCode, sheet: ScoreSheet) {
        guard(&self.sheets).insert(code.clone(), sheet);
    }

    fn next_outcome(&self) -> ChainOutcome {
        guard(&self.script)
            .pop_front()
            .unwrap_or_else(|| guard(&self.fallback).clone())
    }

    /// Sequential receipts; the sequence number doubles as the block height.
    fn next_receipt(&self) -> TxReceipt {
        let n = self.next_tx.fetch_add(1, Ordering::SeqCst);
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&n.to_be_bytes());
        TxReceipt {
            tx_hash: TxHash::new(bytes),
            block_number: Some(n),
        }
    }

    async fn resolve(&self, submission: Submission) -> Result<TxReceipt, ChainError> {
        let outcome = self.next_outcome();
        guard(&self.submissions).push(submission.clone());
        match outcome {
            ChainOutcome::Confirm => {}
            ChainOutcome::ConfirmAfter(delay) => tokio::time::sleep(delay).await,
            ChainOutcome::Reject(reason) => return Err(ChainError::Rejected(reason)),
            ChainOutcome::Fail(reason) => return Err(ChainError::Submission(reason)),
            ChainOutcome::Hang => std::future::pending::<()>().await,
        }

        let mut sheets = guard(&self.sheets);
        match submission {
            Submission::CreateEvent {
                code,
                option_names,
                option_images,
            } => {
                let scores = vec![0; option_names.len()];
                sheets.insert(
                    code,
                    ScoreSheet {
                        names: option_names,
                        scores,
                        images: option_images,
                    },
                );
            }
            Submission::Vote { code, option_index } => {
                let sheet = sheets
                    .get_mut(&code)
                    .ok_or_else(|| ChainError::Rejected(format!("unknown event {code}")))?;
                let score = sheet
                    .scores
                    .get_mut(option_index)
                    .ok_or_else(|| ChainError::Rejected(format!("bad option {option_index}")))?;
                *score += 1;
            }
        }
        drop(sheets);

        Ok(self.next_receipt())
    }
}

impl Default for NullChain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainBridge for NullChain {
    async fn submit_create_event(
        &self,
        code: &EventCode,
        option_names: &[String],
        option_images: &[String],
    ) -> Result<TxReceipt, ChainError> {
        self.resolve(Submission::CreateEvent {
            code: code.clone(),
            option_names: option_names.to_vec(),
            option_images: option_images.to_vec(),
        })
        .await
    }

    async fn submit_vote(
        &self,
        code: &EventCode,
        option_index: usize,
    ) -> Result<TxReceipt, ChainError> {
        self.resolve(Submission::Vote {
            code: code.clone(),
            option_index,
        })
        .await
    }

    async fn fetch_scores(&self, code: &EventCode) -> Result<ScoreSheet, ChainError> {
        guard(&self.sheets)
            .get(code)
            .cloned()
            .ok_or_else(|| ChainError::Rejected(format!("unknown event {code}")))
    }

    fn name(&self) -> &str {
        "null"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code() -> EventCode {
        EventCode::new("evt").unwrap()
    }

    #[tokio::test]
    async fn confirmed_votes_update_remote_scores() {
        let chain = NullChain::new();
        chain
            .submit_create_event(&code(), &["a".into(), "b".into()], &[])
            .await
            .unwrap();
        let first = chain.submit_vote(&code(), 1).await.unwrap();
        let second = chain.submit_vote(&code(), 1).await.unwrap();
        assert_ne!(first.tx_hash, second.tx_hash);
        assert_eq!(chain.fetch_scores(&code()).await.unwrap().scores, vec![0, 2]);
        assert_eq!(chain.vote_submissions(), 2);
    }

    #[tokio::test]
    async fn scripted_outcomes_run_in_order() {
        let chain = NullChain::new();
        chain.push_outcome(ChainOutcome::Fail("offline".into()));
        chain.push_outcome(ChainOutcome::Reject("reverted".into()));

        let err = chain.submit_create_event(&code(), &["a".into()], &[]).await;
        assert!(matches!(err, Err(ChainError::Submission(_))));
        let err = chain.submit_create_event(&code(), &["a".into()], &[]).await;
        assert!(matches!(err, Err(ChainError::Rejected(_))));
        assert!(chain.submit_create_event(&code(), &["a".into()], &[]).await.is_ok());
        assert_eq!(chain.submissions().len(), 3);
    }

    #[tokio::test]
    async fn hang_never_resolves() {
        let chain = NullChain::with_fallback(ChainOutcome::Hang);
        let res = tokio::time::timeout(
            Duration::from_millis(20),
            chain.submit_create_event(&code(), &["a".into()], &[]),
        )
        .await;
        assert!(res.is_err());
    }
}
