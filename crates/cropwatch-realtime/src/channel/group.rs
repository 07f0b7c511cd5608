//! Group naming.

use std::fmt;

use serde::{Deserialize, Serialize};

use cropwatch_core::types::UserId;

/// Name of a delivery group.
///
/// Every process derives the same key for the same user, which is what lets
/// a send from one node reach connections held by another.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupKey(String);

impl GroupKey {
    /// The notification group of `user_id`.
    pub fn for_user(user_id: UserId) -> Self {
        Self(format!("user_{user_id}_notifications"))
    }

    /// Wraps an already formatted key, e.g. one received from a relay.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
