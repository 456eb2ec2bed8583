//! Request and response bodies for a transport layer.
//!
//! Field names are camelCase on the wire. Identity (the authenticated
//! [`UserId`]) is not part of any body; the transport supplies it.

use serde::{Deserialize, Serialize};
use tally_chain::ScoreSheet;
use tally_eligibility::AttemptContext;
use tally_ledger::{EventDefinition, ValidationError};
use tally_types::{EventCode, GeoPoint, TxHash, UserId, VotingType};

use crate::coordinator::{OptionChoice, VoteAttempt};
use crate::{CreateError, QueryError, VoteError};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventRequest {
    /// Generated when absent.
    #[serde(default)]
    pub event_code: Option<String>,
    pub option_names: Vec<String>,
    #[serde(default)]
    pub option_images: Vec<String>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub radius: Option<f64>,
    /// `"standard"` (default) or `"secure"`.
    #[serde(default)]
    pub voting_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl CreateEventRequest {
    /// Turn the body into a definition owned by `organizer`, calling
    /// `generated` when the body carries no code or an empty one.
    pub fn into_definition(
        self,
        organizer: UserId,
        generated: impl FnOnce() -> Result<EventCode, CreateError>,
    ) -> Result<EventDefinition, CreateError> {
        let voting_type = match self.voting_type.as_deref() {
            None => VotingType::default(),
            Some(raw) => raw
                .parse()
                .map_err(|_| ValidationError::UnknownVotingType(raw.to_string()))?,
        };
        let code = match self.event_code.filter(|raw| !raw.is_empty()) {
            Some(raw) => EventCode::new(raw)
                .map_err(|e| ValidationError::InvalidEventCode(e.to_string()))?,
            None => generated()?,
        };
        Ok(EventDefinition {
            code,
            created_by: organizer,
            title: self.title,
            description: self.description,
            voting_type,
            location: self.location,
            radius_m: self.radius,
            option_names: self.option_names,
            option_images: self.option_images,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEventResponse {
    pub event_code: EventCode,
    /// `None` in off-chain mode.
    pub tx_hash: Option<TxHash>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub event_code: String,
    #[serde(default)]
    pub option_index: Option<usize>,
    #[serde(default)]
    pub option_name: Option<String>,
    #[serde(default)]
    pub voter_location: Option<GeoPoint>,
    #[serde(default)]
    pub secure_connected: Option<bool>,
}

impl VoteRequest {
    pub fn into_attempt(self, user: UserId) -> Result<VoteAttempt, VoteError> {
        let code = EventCode::new(self.event_code)
            .map_err(|e| VoteError::InvalidRequest(e.to_string()))?;
        let choice = match (self.option_index, self.option_name) {
            (Some(index), None) => OptionChoice::Index(index),
            (None, Some(name)) => OptionChoice::Name(name),
            (Some(_), Some(_)) => {
                return Err(VoteError::InvalidRequest(
                    "give either optionIndex or optionName, not both".into(),
                ))
            }
            (None, None) => {
                return Err(VoteError::InvalidRequest(
                    "optionIndex or optionName is required".into(),
                ))
            }
        };
        Ok(VoteAttempt {
            code,
            user,
            choice,
            context: AttemptContext {
                voter_location: self.voter_location,
                secure_connected: self.secure_connected,
            },
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResponse {
    pub event_code: EventCode,
    pub option_index: usize,
    /// `None` in off-chain mode.
    pub tx_hash: Option<TxHash>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoresRequest {
    pub event_code: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoresResponse {
    pub names: Vec<String>,
    pub scores: Vec<u64>,
    pub images: Vec<String>,
}

impl From<ScoreSheet> for ScoresResponse {
    fn from(sheet: ScoreSheet) -> Self {
        Self {
            names: sheet.names,
            scores: sheet.scores,
            images: sheet.images,
        }
    }
}

/// Uniform error body: a stable `error` kind plus a human message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    /// Eligibility sub-reason, e.g. `out_of_range`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Remote transaction spent before a local failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<TxHash>,
}

impl From<&VoteError> for ErrorBody {
    fn from(e: &VoteError) -> Self {
        Self {
            error: e.kind().to_string(),
            message: e.to_string(),
            reason: e.deny_reason().map(|r| r.kind().to_string()),
            tx_hash: e.remote_applied(),
        }
    }
}

impl From<&CreateError> for ErrorBody {
    fn from(e: &CreateError) -> Self {
        Self {
            error: e.kind().to_string(),
            message: e.to_string(),
            reason: None,
            tx_hash: e.remote_applied(),
        }
    }
}

impl From<&QueryError> for ErrorBody {
    fn from(e: &QueryError) -> Self {
        Self {
            error: e.kind().to_string(),
            message: e.to_string(),
            reason: None,
            tx_hash: None,
        }
    }
}
