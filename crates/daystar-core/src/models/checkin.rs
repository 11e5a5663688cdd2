use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One completed day for a habit.
///
/// The server enforces at most one check-in per habit per calendar date;
/// the client only ever reads these back for the history view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct CheckIn {
    pub id: i64,
    #[serde(default)]
    pub habit_id: Option<i64>,
    /// The calendar date the user checked in for, as submitted by the client.
    pub check_in_date: NaiveDate,
    #[serde(default)]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
}
