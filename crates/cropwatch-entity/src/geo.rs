//! Geographic value types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::user::UserLocation;

/// A validated latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in `[-90, 90]`.
    pub latitude: f64,
    /// Longitude in `[-180, 180]`.
    pub longitude: f64,
}

/// Raised when a coordinate pair is not a usable location.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("invalid coordinates ({latitude}, {longitude})")]
pub struct InvalidCoordinates {
    /// Offending latitude.
    pub latitude: f64,
    /// Offending longitude.
    pub longitude: f64,
}

impl GeoPoint {
    /// Builds a point, rejecting non-finite or out-of-range coordinates.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, InvalidCoordinates> {
        let in_range = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);

        if in_range {
            Ok(Self {
                latitude,
                longitude,
            })
        } else {
            Err(InvalidCoordinates {
                latitude,
                longitude,
            })
        }
    }

    /// `(0, 0)` is the placeholder written by clients that never set a location.
    pub fn is_null_island(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }
}

/// A user selected by proximity search, tagged with distance from the origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// The directory record, unchanged.
    pub user: UserLocation,
    /// Great-circle distance from the search origin in kilometres.
    pub distance_km: f64,
}

impl Candidate {
    /// Wraps a directory record with its computed distance.
    pub fn new(user: UserLocation, distance_km: f64) -> Self {
        Self { user, distance_km }
    }
}
