//! Event definitions submitted by organizers, and their validation.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tally_types::{EventCode, GeoFence, GeoPoint, UserId, VotingPolicy, VotingType};
use thiserror::Error;

/// Why an event definition was refused.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ValidationError {
    #[error("an event needs at least one option")]
    NoOptions,

    #[error("option {0} has an empty name")]
    EmptyOptionName(usize),

    #[error("option name {0:?} appears more than once")]
    DuplicateOptionName(String),

    #[error("{images} option images given for {names} options")]
    ImageCountMismatch { names: usize, images: usize },

    #[error("standard events require a location")]
    MissingLocation,

    #[error("location ({lat}, {lng}) is not a valid coordinate")]
    InvalidLocation { lat: f64, lng: f64 },

    #[error("standard events require a radius")]
    MissingRadius,

    #[error("radius must be a positive number of meters, got {0}")]
    InvalidRadius(f64),

    #[error("unknown voting type {0:?}")]
    UnknownVotingType(String),

    #[error("invalid event code: {0}")]
    InvalidEventCode(String),
}

/// Everything an organizer supplies to create an event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventDefinition {
    pub code: EventCode,
    pub created_by: UserId,
    pub title: Option<String>,
    pub description: Option<String>,
    pub voting_type: VotingType,
    pub location: Option<GeoPoint>,
    pub radius_m: Option<f64>,
    pub option_names: Vec<String>,
    /// Either empty or one image per option.
    pub option_images: Vec<String>,
}

impl EventDefinition {
    /// A standard definition with no options and no fence yet.
    pub fn new(code: EventCode, created_by: UserId) -> Self {
        Self {
            code,
            created_by,
            title: None,
            description: None,
            voting_type: VotingType::Standard,
            location: None,
            radius_m: None,
            option_names: Vec::new(),
            option_images: Vec::new(),
        }
    }

    pub fn with_options<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.option_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_images<I, S>(mut self, images: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.option_images = images.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_fence(mut self, center: GeoPoint, radius_m: f64) -> Self {
        self.voting_type = VotingType::Standard;
        self.location = Some(center);
        self.radius_m = Some(radius_m);
        self
    }

    pub fn secure(mut self) -> Self {
        self.voting_type = VotingType::Secure;
        self
    }

    /// Check the definition and derive the eligibility policy it describes.
    pub fn validate(&self) -> Result<VotingPolicy, ValidationError> {
        if self.option_names.is_empty() {
            return Err(ValidationError::NoOptions);
        }
        let mut seen = HashSet::with_capacity(self.option_names.len());
        for (i, name) in self.option_names.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(ValidationError::EmptyOptionName(i));
            }
            if !seen.insert(name.as_str()) {
                return Err(ValidationError::DuplicateOptionName(name.clone()));
            }
        }
        if !self.option_images.is_empty() && self.option_images.len() != self.option_names.len() {
            return Err(ValidationError::ImageCountMismatch {
                names: self.option_names.len(),
                images: self.option_images.len(),
            });
        }

        if let Some(point) = self.location {
            if !point.is_well_formed() {
                return Err(ValidationError::InvalidLocation {
                    lat: point.lat,
                    lng: point.lng,
                });
            }
        }

        match self.voting_type {
            VotingType::Standard => {
                let center = self.location.ok_or(ValidationError::MissingLocation)?;
                let radius_m = self.radius_m.ok_or(ValidationError::MissingRadius)?;
                if !radius_m.is_finite() || radius_m <= 0.0 {
                    return Err(ValidationError::InvalidRadius(radius_m));
                }
                Ok(VotingPolicy::Standard {
                    fence: GeoFence::new(center, radius_m),
                })
            }
            VotingType::Secure => Ok(VotingPolicy::Secure {
                venue: self.location,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> EventDefinition {
        EventDefinition::new(
            EventCode::new("evt").unwrap(),
            UserId::new("organizer").unwrap(),
        )
        .with_options(["red", "blue"])
    }

    #[test]
    fn standard_definition_yields_fence() {
        let policy = base()
            .with_fence(GeoPoint::new(0.0, 0.0), 100.0)
            .validate()
            .unwrap();
        assert_eq!(policy.radius_m(), Some(100.0));
    }

    #[test]
    fn standard_requires_location_and_radius() {
        assert_eq!(base().validate(), Err(ValidationError::MissingLocation));

        let mut def = base();
        def.location = Some(GeoPoint::new(1.0, 1.0));
        assert_eq!(def.validate(), Err(ValidationError::MissingRadius));
    }

    #[test]
    fn radius_must_be_positive_and_finite() {
        for r in [0.0, -5.0, f64::INFINITY] {
            let err = base()
                .with_fence(GeoPoint::new(0.0, 0.0), r)
                .validate()
                .unwrap_err();
            assert!(matches!(err, ValidationError::InvalidRadius(_)));
        }
        let err = base()
            .with_fence(GeoPoint::new(0.0, 0.0), f64::NAN)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidRadius(_)));
    }

    #[test]
    fn out_of_bounds_location_is_rejected() {
        let err = base()
            .with_fence(GeoPoint::new(91.0, 0.0), 10.0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidLocation { .. }));
    }

    #[test]
    fn secure_needs_no_fence() {
        let policy = base().secure().validate().unwrap();
        assert_eq!(policy.voting_type(), VotingType::Secure);
        assert_eq!(policy.location(), None);
    }

    #[test]
    fn option_rules() {
        let def = base().with_options(Vec::<String>::new()).secure();
        assert_eq!(def.validate(), Err(ValidationError::NoOptions));

        let def = base().with_options(["a", " "]).secure();
        assert_eq!(def.validate(), Err(ValidationError::EmptyOptionName(1)));

        let def = base().with_options(["a", "a"]).secure();
        assert_eq!(
            def.validate(),
            Err(ValidationError::DuplicateOptionName("a".into()))
        );

        let def = base().with_images(["only-one.png"]).secure();
        assert_eq!(
            def.validate(),
            Err(ValidationError::ImageCountMismatch { names: 2, images: 1 })
        );
    }
}
