//! Prometheus metrics for the vote coordinator.
//!
//! [`CoordinatorMetrics`] owns a dedicated [`Registry`] that the CLI can
//! encode into the Prometheus text exposition format.

use prometheus::{
    register_histogram_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, Encoder, Histogram, HistogramOpts, IntCounter,
    IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::CoordinatorError;

pub struct CoordinatorMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    /// Votes committed to the local ledger.
    pub votes_committed: IntCounter,
    /// Vote attempts turned away, labelled by error kind.
    pub votes_rejected: IntCounterVec,
    /// Events created.
    pub events_created: IntCounter,
    /// Remote submissions that failed, were rejected or timed out.
    pub remote_failures: IntCounter,
    /// Remote successes whose local commit failed.
    pub commit_gaps: IntCounter,

    // ── Histograms ──────────────────────────────────────────────────────
    /// Time from remote submission to confirmation, in milliseconds.
    pub remote_latency_ms: Histogram,
}

impl CoordinatorMetrics {
    pub fn new() -> Result<Self, CoordinatorError> {
        let registry = Registry::new();

        let votes_committed = register_int_counter_with_registry!(
            Opts::new("tally_votes_committed_total", "Votes committed locally"),
            registry
        )?;

        let votes_rejected = register_int_counter_vec_with_registry!(
            Opts::new(
                "tally_votes_rejected_total",
                "Vote attempts that did not commit, by error kind"
            ),
            &["kind"],
            registry
        )?;

        let events_created = register_int_counter_with_registry!(
            Opts::new("tally_events_created_total", "Events created"),
            registry
        )?;

        let remote_failures = register_int_counter_with_registry!(
            Opts::new(
                "tally_remote_failures_total",
                "Remote ledger calls that failed, were rejected or timed out"
            ),
            registry
        )?;

        let commit_gaps = register_int_counter_with_registry!(
            Opts::new(
                "tally_commit_gaps_total",
                "Remote confirmations whose local commit failed"
            ),
            registry
        )?;

        // 10 ms → ~80 s
        let remote_latency_ms = register_histogram_with_registry!(
            HistogramOpts::new(
                "tally_remote_latency_ms",
                "Remote submission to confirmation latency in milliseconds"
            )
            .buckets(prometheus::exponential_buckets(10.0, 2.0, 14)?),
            registry
        )?;

        Ok(Self {
            registry,
            votes_committed,
            votes_rejected,
            events_created,
            remote_failures,
            commit_gaps,
            remote_latency_ms,
        })
    }

    /// Encode every metric in the Prometheus text format.
    pub fn encode(&self) -> Result<String, CoordinatorError> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_show_up_in_text_output() {
        let metrics = CoordinatorMetrics::new().unwrap();
        metrics.votes_committed.inc();
        metrics.votes_rejected.with_label_values(&["already_voted"]).inc();
        metrics.remote_latency_ms.observe(42.0);

        let text = metrics.encode().unwrap();
        assert!(text.contains("tally_votes_committed_total 1"));
        assert!(text.contains("kind=\"already_voted\""));
        assert!(text.contains("tally_remote_latency_ms_bucket"));
    }
}
