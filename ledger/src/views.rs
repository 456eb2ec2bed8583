//! Read-only projections of an event record.
//!
//! [`EventDetails`] is what any voter may see: no tallies, no voter
//! identities. [`EventStats`] carries both and is meant for the organizer.

use serde::{Deserialize, Serialize};
use tally_store::EventRecord;
use tally_types::{EventCode, GeoPoint, Timestamp, TxHash, UserId, VotingType};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionSummary {
    pub name: String,
    pub image: Option<String>,
}

/// Anonymized event description for voters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetails {
    pub event_code: EventCode,
    pub title: Option<String>,
    pub description: Option<String>,
    pub voting_type: VotingType,
    pub location: Option<GeoPoint>,
    pub radius: Option<f64>,
    pub options: Vec<OptionSummary>,
    pub created_at: Timestamp,
}

impl From<&EventRecord> for EventDetails {
    fn from(record: &EventRecord) -> Self {
        Self {
            event_code: record.code.clone(),
            title: record.title.clone(),
            description: record.description.clone(),
            voting_type: record.voting_type(),
            location: record.policy.location(),
            radius: record.policy.radius_m(),
            options: record
                .options
                .iter()
                .map(|o| OptionSummary {
                    name: o.name.clone(),
                    image: o.image.clone(),
                })
                .collect(),
            created_at: record.created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionStats {
    pub name: String,
    pub image: Option<String>,
    pub votes: u64,
}

/// Full local tallies and voter list for the event's organizer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStats {
    pub event_code: EventCode,
    pub created_by: UserId,
    pub voting_type: VotingType,
    pub options: Vec<OptionStats>,
    pub total_votes: u64,
    pub voters: Vec<UserId>,
    pub creation_tx: Option<TxHash>,
}

impl From<&EventRecord> for EventStats {
    fn from(record: &EventRecord) -> Self {
        Self {
            event_code: record.code.clone(),
            created_by: record.created_by.clone(),
            voting_type: record.voting_type(),
            options: record
                .options
                .iter()
                .map(|o| OptionStats {
                    name: o.name.clone(),
                    image: o.image.clone(),
                    votes: o.tally,
                })
                .collect(),
            total_votes: record.total_votes(),
            voters: record.voted_users.iter().cloned().collect(),
            creation_tx: record.creation_tx,
        }
    }
}
