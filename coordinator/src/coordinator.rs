//! The vote coordinator.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tally_chain::{ChainBridge, ChainError, ScoreSheet, TxReceipt};
use tally_eligibility::{check_eligibility, AttemptContext, Eligibility};
use tally_ledger::{EventDefinition, EventDetails, EventStats, Ledger, LedgerError};
use tally_store::{EventRecord, VoteCommit};
use tally_types::{EventCode, TxHash, UserId};
use tracing::Instrument;

use crate::api::{
    CreateEventRequest, CreateEventResponse, ScoresRequest, ScoresResponse, VoteRequest,
    VoteResponse,
};
use crate::audit::AuditReport;
use crate::inflight::InFlight;
use crate::metrics::CoordinatorMetrics;
use crate::stage::{StageTracker, VoteStage};
use crate::tracing_spans;
use crate::{CreateError, QueryError, VoteError};

const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(60);
const CODE_GENERATION_ATTEMPTS: usize = 4;

/// How the voter picked an option.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OptionChoice {
    Index(usize),
    Name(String),
}

impl fmt::Display for OptionChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionChoice::Index(i) => write!(f, "#{i}"),
            OptionChoice::Name(name) => write!(f, "{name:?}"),
        }
    }
}

/// One user's attempt to vote.
#[derive(Clone, Debug, PartialEq)]
pub struct VoteAttempt {
    pub code: EventCode,
    pub user: UserId,
    pub choice: OptionChoice,
    pub context: AttemptContext,
}

/// A committed vote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteOutcome {
    pub code: EventCode,
    pub option_index: usize,
    pub option_name: String,
    /// `None` in off-chain mode.
    pub receipt: Option<TxReceipt>,
    /// The receipt had already been committed for this voter.
    pub replayed: bool,
}

impl VoteOutcome {
    pub fn tx_hash(&self) -> Option<TxHash> {
        self.receipt.map(|r| r.tx_hash)
    }
}

/// A created event.
#[derive(Clone, Debug)]
pub struct CreatedEvent {
    pub record: EventRecord,
    pub receipt: Option<TxReceipt>,
}

/// Sequences votes and event creation across the local ledger and the
/// optional remote ledger.
///
/// Without a bridge the coordinator runs off-chain: votes are committed
/// locally as soon as they pass the gate and scores come from the ledger.
pub struct VoteCoordinator {
    ledger: Ledger,
    chain: Option<Arc<dyn ChainBridge>>,
    remote_timeout: Duration,
    inflight: InFlight,
    metrics: Option<Arc<CoordinatorMetrics>>,
}

impl VoteCoordinator {
    /// An off-chain coordinator over `ledger`.
    pub fn new(ledger: Ledger) -> Self {
        Self {
            ledger,
            chain: None,
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            inflight: InFlight::new(),
            metrics: None,
        }
    }

    pub fn with_chain(mut self, chain: Arc<dyn ChainBridge>) -> Self {
        self.chain = Some(chain);
        self
    }

    /// Bound on each remote call, confirmation included.
    pub fn with_remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<CoordinatorMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn metrics(&self) -> Option<&CoordinatorMetrics> {
        self.metrics.as_deref()
    }

    pub fn is_off_chain(&self) -> bool {
        self.chain.is_none()
    }

    // ── Votes ──────────────────────────────────────────────────────────

    /// Handle a vote body for an authenticated `user`.
    pub async fn cast_vote(
        &self,
        user: &UserId,
        request: VoteRequest,
    ) -> Result<VoteResponse, VoteError> {
        let attempt = request.into_attempt(user.clone())?;
        let outcome = self.vote(attempt).await?;
        Ok(VoteResponse {
            event_code: outcome.code.clone(),
            option_index: outcome.option_index,
            tx_hash: outcome.tx_hash(),
        })
    }

    /// Run one attempt through gate, remote confirmation and local commit.
    pub async fn vote(&self, attempt: VoteAttempt) -> Result<VoteOutcome, VoteError> {
        let span = tracing_spans::vote_span(attempt.code.as_str(), attempt.user.as_str());
        let mut stage = StageTracker::new();
        let result = self
            .run_vote(&attempt, &mut stage)
            .instrument(span.clone())
            .await;
        debug_assert!(
            stage.current().is_terminal(),
            "vote attempt ended in non-terminal stage {}",
            stage.current()
        );

        span.in_scope(|| match &result {
            Ok(outcome) => {
                if let Some(m) = self.metrics() {
                    m.votes_committed.inc();
                }
                tracing::info!(
                    option = outcome.option_index,
                    tx_hash = ?outcome.tx_hash(),
                    replayed = outcome.replayed,
                    "vote committed"
                );
            }
            Err(e) => {
                if let Some(m) = self.metrics() {
                    m.votes_rejected.with_label_values(&[e.kind()]).inc();
                }
                if let Some(tx_hash) = e.remote_applied() {
                    tracing::error!(%tx_hash, error = %e, "vote confirmed remotely but not committed locally");
                } else {
                    tracing::info!(kind = e.kind(), error = %e, "vote not committed");
                }
            }
        });
        result
    }

    async fn run_vote(
        &self,
        attempt: &VoteAttempt,
        stage: &mut StageTracker,
    ) -> Result<VoteOutcome, VoteError> {
        let VoteAttempt {
            code,
            user,
            choice,
            context,
        } = attempt;

        let record = self
            .ledger
            .get_by_code(code)
            .map_err(|e| stage.reject(VoteError::from(e)))?;
        let option_index = resolve_option(&record, choice).map_err(|e| stage.reject(e))?;

        if let Eligibility::Deny(reason) = check_eligibility(&record.policy, context) {
            stage.advance(VoteStage::Rejected);
            return Err(VoteError::EligibilityDenied(reason));
        }
        stage.advance(VoteStage::Eligible);

        if record.has_voted(user) {
            stage.advance(VoteStage::Rejected);
            return Err(VoteError::AlreadyVoted {
                code: code.clone(),
                user: user.clone(),
            });
        }

        let _slot = self.inflight.acquire(code, user).await;
        // An attempt queued ahead of this one may have committed meanwhile.
        if self
            .ledger
            .has_voted(code, user)
            .map_err(|e| stage.reject(VoteError::from(e)))?
        {
            stage.advance(VoteStage::Rejected);
            return Err(VoteError::AlreadyVoted {
                code: code.clone(),
                user: user.clone(),
            });
        }

        let option_name = record.options[option_index].name.clone();

        let Some(chain) = &self.chain else {
            self.ledger
                .record_vote(code, user, option_index)
                .map_err(|e| stage.reject(VoteError::from(e)))?;
            stage.advance(VoteStage::Committed);
            return Ok(VoteOutcome {
                code: code.clone(),
                option_index,
                option_name,
                receipt: None,
                replayed: false,
            });
        };

        stage.advance(VoteStage::Uncommitted);
        let receipt = match self
            .remote(chain.as_ref(), "vote", chain.submit_vote(code, option_index))
            .await
        {
            Ok(receipt) => receipt,
            Err(e) => {
                stage.advance(VoteStage::RemoteFailed);
                return Err(VoteError::Remote(e));
            }
        };
        stage.advance(VoteStage::Confirmed);

        let committed = self
            .ledger
            .commit_vote(code, user, option_index, &receipt.tx_hash)
            .map_err(|source| stage.reject(self.commit_gap_vote(receipt.tx_hash, source)))?;
        stage.advance(VoteStage::Committed);

        Ok(VoteOutcome {
            code: code.clone(),
            option_index,
            option_name,
            receipt: Some(receipt),
            replayed: committed.commit == VoteCommit::Replayed,
        })
    }

    fn commit_gap_vote(&self, tx_hash: TxHash, source: LedgerError) -> VoteError {
        if let Some(m) = self.metrics() {
            m.commit_gaps.inc();
        }
        VoteError::CommitAfterRemote { tx_hash, source }
    }

    // ── Events ─────────────────────────────────────────────────────────

    /// Handle a create-event body for an authenticated organizer.
    pub async fn create_event(
        &self,
        organizer: &UserId,
        request: CreateEventRequest,
    ) -> Result<CreateEventResponse, CreateError> {
        let definition = request.into_definition(organizer.clone(), || self.generate_code())?;
        let created = self.create(definition).await?;
        Ok(CreateEventResponse {
            event_code: created.record.code,
            tx_hash: created.receipt.map(|r| r.tx_hash),
        })
    }

    /// Validate, register remotely (if on-chain) and persist an event.
    pub async fn create(&self, definition: EventDefinition) -> Result<CreatedEvent, CreateError> {
        let span =
            tracing_spans::create_event_span(definition.code.as_str(), definition.created_by.as_str());
        let result = self.run_create(&definition).instrument(span.clone()).await;

        span.in_scope(|| match &result {
            Ok(created) => {
                if let Some(m) = self.metrics() {
                    m.events_created.inc();
                }
                tracing::info!(tx_hash = ?created.receipt.map(|r| r.tx_hash), "event ready");
            }
            Err(e) if e.remote_applied().is_some() => {
                tracing::error!(error = %e, "event registered remotely but not recorded locally");
            }
            Err(e) => tracing::info!(kind = e.kind(), error = %e, "event not created"),
        });
        result
    }

    async fn run_create(&self, definition: &EventDefinition) -> Result<CreatedEvent, CreateError> {
        self.ledger.validate(definition)?;

        let Some(chain) = &self.chain else {
            let record = self.ledger.create_event(definition, None)?;
            return Ok(CreatedEvent {
                record,
                receipt: None,
            });
        };

        let receipt = self
            .remote(
                chain.as_ref(),
                "create_event",
                chain.submit_create_event(
                    &definition.code,
                    &definition.option_names,
                    &definition.option_images,
                ),
            )
            .await
            .map_err(CreateError::Remote)?;

        let record = self
            .ledger
            .create_event(definition, Some(receipt.tx_hash))
            .map_err(|source| {
                if let Some(m) = self.metrics() {
                    m.commit_gaps.inc();
                }
                CreateError::CommitAfterRemote {
                    tx_hash: receipt.tx_hash,
                    source,
                }
            })?;
        Ok(CreatedEvent {
            record,
            receipt: Some(receipt),
        })
    }

    /// A fresh random code not yet used locally.
    fn generate_code(&self) -> Result<EventCode, CreateError> {
        for _ in 0..CODE_GENERATION_ATTEMPTS {
            let mut bytes = [0u8; 8];
            getrandom::getrandom(&mut bytes)
                .map_err(|e| CreateError::CodeGeneration(e.to_string()))?;
            let code = EventCode::from_random_bytes(&bytes);
            match self.ledger.get_by_code(&code) {
                Err(LedgerError::NotFound(_)) => return Ok(code),
                Ok(_) => continue,
                Err(e) => return Err(CreateError::Persistence(e)),
            }
        }
        Err(CreateError::CodeGeneration(format!(
            "no unused code after {CODE_GENERATION_ATTEMPTS} attempts"
        )))
    }

    // ── Queries ────────────────────────────────────────────────────────

    /// Public event description; any authenticated user may read it.
    pub fn event_details(&self, code: &EventCode) -> Result<EventDetails, QueryError> {
        Ok(self.ledger.event_details(code)?)
    }

    /// Tallies and voters, for the event's organizer only.
    pub fn event_stats(&self, code: &EventCode, requester: &UserId) -> Result<EventStats, QueryError> {
        let record = self.organizer_record(code, requester)?;
        Ok(EventStats::from(&record))
    }

    /// Current scores: the remote sheet when on-chain, local tallies otherwise.
    pub async fn scores(&self, request: ScoresRequest) -> Result<ScoresResponse, QueryError> {
        let code = EventCode::new(request.event_code)
            .map_err(|e| QueryError::InvalidRequest(e.to_string()))?;
        Ok(self.score_sheet(&code).await?.into())
    }

    pub async fn score_sheet(&self, code: &EventCode) -> Result<ScoreSheet, QueryError> {
        let record = self.ledger.get_by_code(code)?;
        match &self.chain {
            Some(chain) => self
                .remote(chain.as_ref(), "scores", chain.fetch_scores(code))
                .await
                .map_err(QueryError::Remote),
            None => Ok(local_sheet(&record)),
        }
    }

    /// Compare local tallies with the remote ledger. Organizer only.
    pub async fn audit(&self, code: &EventCode, requester: &UserId) -> Result<AuditReport, QueryError> {
        let span = tracing_spans::audit_span(code.as_str());
        async {
            let record = self.organizer_record(code, requester)?;
            let chain = self.chain.as_ref().ok_or(QueryError::NoRemoteLedger)?;
            let sheet = self
                .remote(chain.as_ref(), "scores", chain.fetch_scores(code))
                .await
                .map_err(QueryError::Remote)?;
            let report = AuditReport::compare(&record, &sheet);
            if report.is_clean() {
                tracing::info!(total = report.local_total, "audit clean");
            } else {
                tracing::warn!(
                    local_total = report.local_total,
                    remote_total = report.remote_total,
                    discrepancies = report.discrepancies.len(),
                    "audit found discrepancies"
                );
            }
            Ok(report)
        }
        .instrument(span)
        .await
    }

    fn organizer_record(&self, code: &EventCode, requester: &UserId) -> Result<EventRecord, QueryError> {
        let record = self.ledger.get_by_code(code)?;
        if &record.created_by != requester {
            return Err(QueryError::NotAuthorized {
                code: code.clone(),
                user: requester.clone(),
            });
        }
        Ok(record)
    }

    // ── Remote calls ───────────────────────────────────────────────────

    /// Run a remote call under the coordinator's timeout.
    ///
    /// Dropping the future on timeout abandons the call; nothing local has
    /// been touched at that point.
    async fn remote<T>(
        &self,
        chain: &dyn ChainBridge,
        method: &str,
        call: impl Future<Output = Result<T, ChainError>>,
    ) -> Result<T, ChainError> {
        let span = tracing_spans::remote_call_span(chain.name(), method);
        let started = Instant::now();
        let result = match tokio::time::timeout(self.remote_timeout, call.instrument(span)).await {
            Ok(result) => result,
            Err(_) => Err(ChainError::Timeout(self.remote_timeout)),
        };

        if let Some(m) = self.metrics() {
            match &result {
                Ok(_) => m
                    .remote_latency_ms
                    .observe(started.elapsed().as_secs_f64() * 1_000.0),
                Err(_) => m.remote_failures.inc(),
            }
        }
        if let Err(e) = &result {
            tracing::warn!(method, kind = e.kind(), error = %e, "remote call failed");
        }
        result
    }
}

fn resolve_option(record: &EventRecord, choice: &OptionChoice) -> Result<usize, VoteError> {
    let found = match choice {
        OptionChoice::Index(i) if *i < record.options.len() => Some(*i),
        OptionChoice::Index(_) => None,
        OptionChoice::Name(name) => record.option_index(name),
    };
    found.ok_or_else(|| VoteError::InvalidOption {
        choice: choice.clone(),
        options: record.options.len(),
    })
}

fn local_sheet(record: &EventRecord) -> ScoreSheet {
    ScoreSheet {
        names: record.options.iter().map(|o| o.name.clone()).collect(),
        scores: record.tallies(),
        images: record
            .options
            .iter()
            .map(|o| o.image.clone().unwrap_or_default())
            .collect(),
    }
}
