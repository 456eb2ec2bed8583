//! Per-attempt eligibility gate.

use serde::{Deserialize, Serialize};
use std::fmt;
use tally_types::{GeoPoint, VotingPolicy};

use crate::geo;

/// What the caller supplied alongside a vote attempt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AttemptContext {
    pub voter_location: Option<GeoPoint>,
    pub secure_connected: Option<bool>,
}

/// Why an attempt was turned away by the gate.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DenyReason {
    /// Standard event, but no usable voter location was supplied.
    MissingLocation,
    /// Standard event, voter is farther than the fence radius.
    OutOfRange { distance_m: f64, radius_m: f64 },
    /// Secure event, but the caller is not on a secure connection.
    InsecureConnection,
}

impl DenyReason {
    /// Stable discriminant for callers and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            DenyReason::MissingLocation => "missing_location",
            DenyReason::OutOfRange { .. } => "out_of_range",
            DenyReason::InsecureConnection => "insecure_connection",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::MissingLocation => {
                f.write_str("voter location is required for standard voting")
            }
            DenyReason::OutOfRange {
                distance_m,
                radius_m,
            } => write!(
                f,
                "voter is {distance_m:.1} m from the event, outside the allowed {radius_m:.1} m radius"
            ),
            DenyReason::InsecureConnection => {
                f.write_str("secure voting requires a secure (wired) connection")
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Eligibility {
    Allow,
    Deny(DenyReason),
}

impl Eligibility {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Eligibility::Allow)
    }
}

/// Evaluate an attempt against the event's policy.
///
/// A location that is present but not well-formed (non-finite or out of
/// coordinate bounds) is treated the same as a missing one.
pub fn check_eligibility(policy: &VotingPolicy, attempt: &AttemptContext) -> Eligibility {
    match policy {
        VotingPolicy::Standard { fence } => {
            let Some(location) = attempt.voter_location.filter(GeoPoint::is_well_formed) else {
                return Eligibility::Deny(DenyReason::MissingLocation);
            };
            let distance_m = geo::distance_m(fence.center, location);
            if distance_m > fence.radius_m {
                tracing::debug!(distance_m, radius_m = fence.radius_m, "voter outside geofence");
                Eligibility::Deny(DenyReason::OutOfRange {
                    distance_m,
                    radius_m: fence.radius_m,
                })
            } else {
                Eligibility::Allow
            }
        }
        VotingPolicy::Secure { .. } => {
            if attempt.secure_connected == Some(true) {
                Eligibility::Allow
            } else {
                Eligibility::Deny(DenyReason::InsecureConnection)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_types::GeoFence;

    fn standard(radius_m: f64) -> VotingPolicy {
        VotingPolicy::Standard {
            fence: GeoFence::new(GeoPoint::new(0.0, 0.0), radius_m),
        }
    }

    fn at(lat: f64, lng: f64) -> AttemptContext {
        AttemptContext {
            voter_location: Some(GeoPoint::new(lat, lng)),
            secure_connected: None,
        }
    }

    #[test]
    fn standard_requires_location() {
        let result = check_eligibility(&standard(100.0), &AttemptContext::default());
        assert_eq!(result, Eligibility::Deny(DenyReason::MissingLocation));
    }

    #[test]
    fn standard_treats_malformed_location_as_missing() {
        let result = check_eligibility(&standard(100.0), &at(f64::NAN, 0.0));
        assert_eq!(result, Eligibility::Deny(DenyReason::MissingLocation));
        let result = check_eligibility(&standard(100.0), &at(0.0, 200.0));
        assert_eq!(result, Eligibility::Deny(DenyReason::MissingLocation));
    }

    #[test]
    fn standard_denies_out_of_range() {
        match check_eligibility(&standard(100.0), &at(0.0, 0.001)) {
            Eligibility::Deny(reason @ DenyReason::OutOfRange { .. }) => {
                assert_eq!(reason.kind(), "out_of_range")
            }
            other => panic!("expected out of range, got {other:?}"),
        }
    }

    #[test]
    fn standard_allows_inside_fence() {
        assert!(check_eligibility(&standard(100.0), &at(0.0, 0.0005)).is_allowed());
    }

    #[test]
    fn standard_ignores_secure_flag() {
        let attempt = AttemptContext {
            voter_location: None,
            secure_connected: Some(true),
        };
        assert!(!check_eligibility(&standard(100.0), &attempt).is_allowed());
    }

    #[test]
    fn secure_requires_flag() {
        let policy = VotingPolicy::Secure { venue: None };
        let denied = AttemptContext {
            voter_location: None,
            secure_connected: Some(false),
        };
        assert_eq!(
            check_eligibility(&policy, &denied),
            Eligibility::Deny(DenyReason::InsecureConnection)
        );
        assert_eq!(
            check_eligibility(&policy, &AttemptContext::default()),
            Eligibility::Deny(DenyReason::InsecureConnection)
        );
        let allowed = AttemptContext {
            voter_location: None,
            secure_connected: Some(true),
        };
        assert!(check_eligibility(&policy, &allowed).is_allowed());
    }

    #[test]
    fn secure_ignores_location() {
        let policy = VotingPolicy::Secure {
            venue: Some(GeoPoint::new(0.0, 0.0)),
        };
        let far_but_secure = AttemptContext {
            voter_location: Some(GeoPoint::new(45.0, 45.0)),
            secure_connected: Some(true),
        };
        assert!(check_eligibility(&policy, &far_but_secure).is_allowed());
    }
}
