use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Condition, Ratings, SessionRecord};

pub const SAVE_DATA_ROUTE: &str = "/api/save-data";

/// Body posted to the local persistence service once a session finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveDataRequest {
    pub timestamp: DateTime<Utc>,
    pub condition: Condition,
    pub ratings: Ratings,
    #[serde(default)]
    pub notes: String,
}

impl SaveDataRequest {
    pub fn from_record(record: &SessionRecord, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            condition: record.condition,
            ratings: record.ratings.clone(),
            notes: record.notes.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveDataResponse {
    pub success: bool,
    pub filename: String,
}
