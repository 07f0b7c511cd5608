//! Geographic candidate selection.

pub mod haversine;
pub mod proximity;
pub mod relevance;

pub use haversine::{EARTH_RADIUS_KM, haversine_km};
