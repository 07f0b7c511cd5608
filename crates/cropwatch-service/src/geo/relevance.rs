//! Crop relevance filtering.

use cropwatch_entity::geo::Candidate;

/// Keeps candidates who grow `crop`.
///
/// An empty `crop` applies to everyone. A candidate with no recorded crops
/// is treated as growing everything and is always kept.
pub fn filter_by_crop(candidates: Vec<Candidate>, crop: &str) -> Vec<Candidate> {
    if crop.is_empty() {
        return candidates;
    }

    candidates
        .into_iter()
        .filter(|c| c.user.crops.is_empty() || c.user.grows(crop))
        .collect()
}
