//! Read-only projection of a directory user.

use serde::{Deserialize, Serialize};

use cropwatch_core::types::UserId;

use crate::geo::{GeoPoint, InvalidCoordinates};

/// A user as seen by the fanout engine: identity, raw location, crops grown.
///
/// Coordinates are kept raw because the directory does not guarantee they
/// are valid; [`UserLocation::location`] performs the check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLocation {
    /// User identifier.
    pub id: UserId,
    /// Display name.
    pub username: String,
    /// Raw latitude, if the user set one.
    pub latitude: Option<f64>,
    /// Raw longitude, if the user set one.
    pub longitude: Option<f64>,
    /// Crops the user grows. Empty means unspecified.
    #[serde(default)]
    pub crops: Vec<String>,
}

impl UserLocation {
    /// Resolves the stored coordinates.
    ///
    /// Returns `Ok(None)` when the user has no location (either coordinate
    /// missing, or the `(0, 0)` placeholder) and `Err` when the stored
    /// values are not a valid point.
    pub fn location(&self) -> Result<Option<GeoPoint>, InvalidCoordinates> {
        let (Some(latitude), Some(longitude)) = (self.latitude, self.longitude) else {
            return Ok(None);
        };

        let point = GeoPoint::new(latitude, longitude)?;
        if point.is_null_island() {
            return Ok(None);
        }
        Ok(Some(point))
    }

    /// Whether the user grows `crop` (case-insensitive exact match).
    pub fn grows(&self, crop: &str) -> bool {
        let wanted = crop.to_lowercase();
        self.crops.iter().any(|c| c.to_lowercase() == wanted)
    }
}
