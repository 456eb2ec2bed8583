//! Local-versus-remote tally comparison.

use serde::{Deserialize, Serialize};
use tally_chain::ScoreSheet;
use tally_store::EventRecord;
use tally_types::EventCode;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionDiscrepancy {
    pub name: String,
    /// `None` when the option is unknown locally.
    pub local: Option<u64>,
    /// `None` when the option is unknown remotely.
    pub remote: Option<u64>,
}

/// Result of comparing one event's local record with the remote score sheet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub event_code: EventCode,
    pub local_total: u64,
    pub remote_total: u64,
    pub voters: u64,
    /// `sum(tally) == |voters|` on the local record.
    pub local_consistent: bool,
    pub discrepancies: Vec<OptionDiscrepancy>,
}

impl AuditReport {
    pub fn compare(record: &EventRecord, remote: &ScoreSheet) -> Self {
        let mut discrepancies = Vec::new();
        for option in &record.options {
            let remote_score = remote.score_of(&option.name);
            if remote_score != Some(option.tally) {
                discrepancies.push(OptionDiscrepancy {
                    name: option.name.clone(),
                    local: Some(option.tally),
                    remote: remote_score,
                });
            }
        }
        for (name, score) in remote.names.iter().zip(&remote.scores) {
            if record.option_index(name).is_none() {
                discrepancies.push(OptionDiscrepancy {
                    name: name.clone(),
                    local: None,
                    remote: Some(*score),
                });
            }
        }

        let local_total = record.total_votes();
        let voters = record.voted_users.len() as u64;
        Self {
            event_code: record.code.clone(),
            local_total,
            remote_total: remote.total(),
            voters,
            local_consistent: local_total == voters,
            discrepancies,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.local_consistent && self.discrepancies.is_empty()
    }
}
