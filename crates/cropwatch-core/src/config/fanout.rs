//! Alert fanout caps.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Limits applied when selecting recipients for an alert.
///
/// The two caps are independent: `max_recipients` bounds the proximity
/// scan run during fanout, `proximity_max_results` bounds raw
/// "who is near this point" queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanoutConfig {
    /// Maximum nearby recipients notified per alert.
    #[serde(default = "default_max_recipients")]
    pub max_recipients: usize,
    /// Maximum candidates returned by a raw proximity query.
    #[serde(default = "default_proximity_max_results")]
    pub proximity_max_results: usize,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            max_recipients: default_max_recipients(),
            proximity_max_results: default_proximity_max_results(),
        }
    }
}

impl FanoutConfig {
    /// Both caps must be positive.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.max_recipients == 0 {
            return Err(AppError::configuration(
                "fanout.max_recipients must be greater than zero",
            ));
        }
        if self.proximity_max_results == 0 {
            return Err(AppError::configuration(
                "fanout.proximity_max_results must be greater than zero",
            ));
        }
        Ok(())
    }
}

fn default_max_recipients() -> usize {
    50
}

fn default_proximity_max_results() -> usize {
    100
}
