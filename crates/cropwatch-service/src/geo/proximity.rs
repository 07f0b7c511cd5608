//! Radius search over the user directory.
//!
//! The scan walks the directory in its natural order and stops as soon as
//! `max_results` users inside the radius have been collected. Results are
//! therefore *not* the closest `max_results` users when more than that many
//! qualify; they are the first ones the directory yielded. That is
//! acceptable for alerting (everyone in range is equally entitled to the
//! alert) but must not be used where ranked nearest-neighbour output is
//! needed.

use std::sync::Arc;

use tracing::debug;

use cropwatch_core::error::AppError;
use cropwatch_core::result::AppResult;
use cropwatch_entity::geo::{Candidate, GeoPoint};
use cropwatch_entity::traits::UserDirectory;
use cropwatch_entity::user::UserLocation;

use super::haversine::haversine_km;

/// Selects users within a radius of a point.
#[derive(Clone)]
pub struct ProximitySearch {
    /// Population source.
    directory: Arc<dyn UserDirectory>,
    /// Cap used by [`ProximitySearch::nearby_users`].
    default_max_results: usize,
}

impl std::fmt::Debug for ProximitySearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProximitySearch")
            .field("default_max_results", &self.default_max_results)
            .finish()
    }
}

impl ProximitySearch {
    /// Creates a search over `directory`; raw queries are capped at `default_max_results`.
    pub fn new(directory: Arc<dyn UserDirectory>, default_max_results: usize) -> Self {
        Self {
            directory,
            default_max_results,
        }
    }

    /// Users within `radius_km` of `origin`, at most `max_results` of them,
    /// in directory order.
    pub async fn find_within(
        &self,
        origin: GeoPoint,
        radius_km: f64,
        max_results: usize,
    ) -> AppResult<Vec<Candidate>> {
        validate_query(&origin, radius_km, max_results)?;

        let population = self.directory.list_users_with_location().await?;
        let scanned = population.len();
        let candidates = select_within(population, &origin, radius_km, max_results);

        debug!(
            latitude = origin.latitude,
            longitude = origin.longitude,
            radius_km,
            max_results,
            scanned,
            found = candidates.len(),
            "Proximity search complete"
        );

        Ok(candidates)
    }

    /// [`find_within`](Self::find_within) with the configured raw-query cap.
    pub async fn nearby_users(&self, origin: GeoPoint, radius_km: f64) -> AppResult<Vec<Candidate>> {
        self.find_within(origin, radius_km, self.default_max_results)
            .await
    }
}

fn validate_query(origin: &GeoPoint, radius_km: f64, max_results: usize) -> AppResult<()> {
    GeoPoint::new(origin.latitude, origin.longitude)
        .map_err(|e| AppError::validation(format!("Search origin: {e}")))?;
    if !radius_km.is_finite() || radius_km <= 0.0 {
        return Err(AppError::validation(format!(
            "Search radius must be positive, got {radius_km}"
        )));
    }
    if max_results == 0 {
        return Err(AppError::validation("max_results must be at least 1"));
    }
    Ok(())
}

/// Scans `population` in order, keeping users within `radius_km` until
/// `max_results` have been found.
///
/// Users without a location or at the `(0, 0)` placeholder are ignored;
/// users whose stored coordinates are invalid are logged and skipped.
pub fn select_within(
    population: impl IntoIterator<Item = UserLocation>,
    origin: &GeoPoint,
    radius_km: f64,
    max_results: usize,
) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    if max_results == 0 {
        return candidates;
    }

    for user in population {
        let point = match user.location() {
            Ok(Some(point)) => point,
            Ok(None) => continue,
            Err(e) => {
                debug!(user_id = %user.id, error = %e, "Skipping user with malformed location");
                continue;
            }
        };

        let distance_km = haversine_km(origin, &point);
        if distance_km <= radius_km {
            candidates.push(Candidate::new(user, distance_km));
            if candidates.len() >= max_results {
                break;
            }
        }
    }

    candidates
}

#[cfg(test)]
mod tests {
    use cropwatch_core::types::UserId;
    use cropwatch_database::memory::MemoryUserDirectory;

    use super::*;

    fn user_at(name: &str, lat: f64, lon: f64) -> UserLocation {
        UserLocation {
            id: UserId::new(),
            username: name.to_string(),
            latitude: Some(lat),
            longitude: Some(lon),
            crops: Vec::new(),
        }
    }

    fn origin() -> GeoPoint {
        GeoPoint::new(10.0, 20.0).unwrap()
    }

    /// About 0.009° of latitude per kilometre.
    fn km_north(km: f64) -> f64 {
        10.0 + km / 111.19492664455873
    }

    fn names(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.user.username.as_str()).collect()
    }

    #[test]
    fn test_selects_inside_radius_with_distance() {
        let population = vec![
            user_at("near", km_north(10.0), 20.0),
            user_at("far", km_north(80.0), 20.0),
        ];

        let found = select_within(population, &origin(), 50.0, 100);
        assert_eq!(names(&found), vec!["near"]);
        assert!((found[0].distance_km - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_radius_is_inclusive() {
        let population = vec![user_at("same-spot", 10.0, 20.0)];
        let found = select_within(population, &origin(), f64::MIN_POSITIVE, 10);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].distance_km, 0.0);
    }

    #[test]
    fn test_never_returns_null_island() {
        let population = vec![user_at("placeholder", 0.0, 0.0)];
        let found = select_within(population, &GeoPoint::new(0.0, 0.1).unwrap(), 1000.0, 10);
        assert!(found.is_empty());
    }

    #[test]
    fn test_skips_malformed_without_aborting() {
        let mut broken = user_at("broken", 10.0, 20.0);
        broken.latitude = Some(f64::NAN);
        let mut out_of_range = user_at("out-of-range", 10.0, 20.0);
        out_of_range.longitude = Some(500.0);
        let mut missing = user_at("missing", 10.0, 20.0);
        missing.longitude = None;

        let population = vec![broken, out_of_range, missing, user_at("ok", 10.0, 20.0)];
        let found = select_within(population, &origin(), 5.0, 10);
        assert_eq!(names(&found), vec!["ok"]);
    }

    #[test]
    fn test_stops_at_cap_in_population_order() {
        let population = vec![
            user_at("third-closest", km_north(30.0), 20.0),
            user_at("closest", km_north(1.0), 20.0),
            user_at("second-closest", km_north(10.0), 20.0),
        ];

        let found = select_within(population, &origin(), 50.0, 2);
        assert_eq!(names(&found), vec!["third-closest", "closest"]);
    }

    #[tokio::test]
    async fn test_find_within_reads_directory() {
        let directory = Arc::new(MemoryUserDirectory::with_users(vec![
            user_at("a", km_north(5.0), 20.0),
            user_at("b", km_north(500.0), 20.0),
        ]));
        let search = ProximitySearch::new(directory, 100);

        let found = search.nearby_users(origin(), 50.0).await.unwrap();
        assert_eq!(names(&found), vec!["a"]);
    }

    #[tokio::test]
    async fn test_nearby_users_uses_default_cap() {
        let population = (0..5)
            .map(|i| user_at(&format!("u{i}"), 10.0, 20.0))
            .collect();
        let search = ProximitySearch::new(Arc::new(MemoryUserDirectory::with_users(population)), 3);

        assert_eq!(search.nearby_users(origin(), 1.0).await.unwrap().len(), 3);
        assert_eq!(search.find_within(origin(), 1.0, 5).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_rejects_invalid_query() {
        let search = ProximitySearch::new(Arc::new(MemoryUserDirectory::new()), 100);
        assert!(search.find_within(origin(), 0.0, 10).await.is_err());
        assert!(search.find_within(origin(), f64::NAN, 10).await.is_err());
        assert!(search.find_within(origin(), 10.0, 0).await.is_err());

        let bad_origin = GeoPoint {
            latitude: 100.0,
            longitude: 0.0,
        };
        assert!(search.find_within(bad_origin, 10.0, 10).await.is_err());
    }
}
