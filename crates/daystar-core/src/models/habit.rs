use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A tracked habit.
///
/// Server-owned. `streak` is computed by the backend from the check-in
/// history; the client displays the most recent value it was given and
/// never derives its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Habit {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub icon: String,
    pub colour: String,
    /// Consecutive qualifying days, as last reported by the server.
    #[serde(default)]
    pub streak: u32,
    pub created_at: DateTime<Utc>,
}

/// Editable habit fields, sent verbatim as the create/update request body.
///
/// The only client-side check is that `title` is non-empty; uniqueness and
/// length limits are the server's call.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct HabitDraft {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub icon: String,
    pub colour: String,
}

impl HabitDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            icon: "⭐".to_string(),
            colour: "#FBBF24".to_string(),
        }
    }
}

/// Aggregate numbers for the dashboard header.
///
/// Pure aggregation of server-returned values; `best_streak` is a max over
/// `Habit::streak`, not a recomputation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HabitStats {
    pub active_habits: usize,
    pub best_streak: u32,
    pub total_check_ins: usize,
}
