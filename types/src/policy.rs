//! Voting-type selectors and the eligibility policy bound to an event.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{GeoFence, GeoPoint, TypeError};

/// Eligibility policy selector as exposed to callers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VotingType {
    /// Voter must be physically inside the event's geofence.
    #[default]
    Standard,
    /// Voter must report a secure (wired) connection.
    Secure,
}

impl VotingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VotingType::Standard => "standard",
            VotingType::Secure => "secure",
        }
    }
}

impl fmt::Display for VotingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VotingType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(VotingType::Standard),
            "secure" => Ok(VotingType::Secure),
            other => Err(TypeError::UnknownVotingType(other.to_string())),
        }
    }
}

/// The eligibility policy stored with an event.
///
/// The fence only exists for `Standard` events, so a standard event without a
/// location or radius cannot be represented.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum VotingPolicy {
    Standard { fence: GeoFence },
    Secure { venue: Option<GeoPoint> },
}

impl VotingPolicy {
    pub fn voting_type(&self) -> VotingType {
        match self {
            VotingPolicy::Standard { .. } => VotingType::Standard,
            VotingPolicy::Secure { .. } => VotingType::Secure,
        }
    }

    /// The registered event location, if any.
    pub fn location(&self) -> Option<GeoPoint> {
        match self {
            VotingPolicy::Standard { fence } => Some(fence.center),
            VotingPolicy::Secure { venue } => *venue,
        }
    }

    pub fn radius_m(&self) -> Option<f64> {
        match self {
            VotingPolicy::Standard { fence } => Some(fence.radius_m),
            VotingPolicy::Secure { .. } => None,
        }
    }
}
