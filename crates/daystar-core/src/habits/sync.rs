//! Keeps the local habit view consistent with server-computed state.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use futures::stream::{self, StreamExt};
use tokio::sync::watch;
use tracing::debug;

use crate::api::{ApiError, HabitsApi};
use crate::auth::Session;
use crate::models::{CheckIn, Habit, HabitDraft, HabitStats};

/// Maximum concurrent check-in history fetches for the stats summary.
/// Bounded so a long habit list cannot flood the server.
const MAX_CONCURRENT_REQUESTS: usize = 4;

/// Result of a check-in attempt that reached the server.
///
/// A rejection is an expected business outcome - the server declining a
/// date that already has a check-in - and deliberately not an error, so
/// the UI can phrase it differently from a transport failure.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckInOutcome {
    /// The day was recorded; the habit carries the server's new streak.
    Recorded(Habit),
    /// The server declined the date, with its own wording.
    Rejected { message: String },
}

/// Owner of the habit read cache.
///
/// The cache is display state only: refreshed wholesale from the server
/// after every mutation, never spliced, and never treated as
/// authoritative. All operations gate on an authenticated session
/// snapshot - reads come back empty, mutations fail without touching the
/// network.
pub struct HabitSyncController<A> {
    api: Arc<A>,
    session: watch::Receiver<Session>,
    habits: watch::Sender<Vec<Habit>>,
}

impl<A: HabitsApi> HabitSyncController<A> {
    pub fn new(api: Arc<A>, session: watch::Receiver<Session>) -> Self {
        let (habits, _) = watch::channel(Vec::new());
        Self {
            api,
            session,
            habits,
        }
    }

    fn is_authenticated(&self) -> bool {
        self.session.borrow().is_authenticated()
    }

    fn require_auth(&self) -> Result<(), ApiError> {
        if self.is_authenticated() {
            Ok(())
        } else {
            Err(ApiError::Unauthorized { message: None })
        }
    }

    /// Current cache snapshot.
    pub fn habits(&self) -> Vec<Habit> {
        self.habits.borrow().clone()
    }

    /// Observe cache replacements.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Habit>> {
        self.habits.subscribe()
    }

    /// Replace the cache with the server's habit list. When the session is
    /// not authenticated the cache empties instead, so nothing stale
    /// outlives a logout.
    pub async fn refresh(&self) -> Result<Vec<Habit>, ApiError> {
        if !self.is_authenticated() {
            self.habits.send_replace(Vec::new());
            return Ok(Vec::new());
        }
        let habits = self.api.list_habits().await?;
        debug!(count = habits.len(), "habit list refreshed");
        self.habits.send_replace(habits.clone());
        Ok(habits)
    }

    /// Create a habit, then re-fetch the whole list. The only local check
    /// is a non-empty title; everything else is the server's call.
    pub async fn create_habit(&self, draft: &HabitDraft) -> Result<Habit, ApiError> {
        self.require_auth()?;
        validate_title(&draft.title)?;
        let habit = self.api.create_habit(draft).await?;
        self.refresh().await?;
        Ok(habit)
    }

    /// Update a habit's editable fields, then re-fetch the whole list so
    /// derived fields (streak resets included) match server truth.
    pub async fn update_habit(&self, id: i64, draft: &HabitDraft) -> Result<Habit, ApiError> {
        self.require_auth()?;
        validate_title(&draft.title)?;
        let habit = self.api.update_habit(id, draft).await?;
        self.refresh().await?;
        Ok(habit)
    }

    /// Check in for today, by the device's local calendar. The server is
    /// authoritative on whether today already has a check-in; its
    /// rejection comes back as [`CheckInOutcome::Rejected`], not an error.
    ///
    /// Callers must not issue concurrent check-ins for the same habit -
    /// the UI disables the action while one is pending.
    pub async fn check_in(&self, habit_id: i64) -> Result<CheckInOutcome, ApiError> {
        self.require_auth()?;
        let today = local_today();
        match self.api.check_in(habit_id, today).await {
            Ok(habit) => {
                self.refresh().await?;
                Ok(CheckInOutcome::Recorded(habit))
            }
            Err(ApiError::Validation { message, .. }) => {
                debug!(habit_id, %message, "check-in declined by server");
                Ok(CheckInOutcome::Rejected { message })
            }
            Err(e) => Err(e),
        }
    }

    /// Check-in history for one habit, newest ordering as the server sends it.
    pub async fn check_ins(&self, habit_id: i64) -> Result<Vec<CheckIn>, ApiError> {
        if !self.is_authenticated() {
            return Ok(Vec::new());
        }
        self.api.list_check_ins(habit_id).await
    }

    /// Dashboard numbers: habit count, best streak, total check-ins.
    ///
    /// Aggregates server-returned values only. History fetches fan out
    /// with bounded concurrency.
    pub async fn stats(&self) -> Result<HabitStats, ApiError> {
        if !self.is_authenticated() {
            return Ok(HabitStats::default());
        }
        let habits = self.refresh().await?;
        let best_streak = habits.iter().map(|h| h.streak).max().unwrap_or(0);

        let counts: Vec<Result<usize, ApiError>> = stream::iter(habits.iter().map(|habit| {
            let api = Arc::clone(&self.api);
            let id = habit.id;
            async move { api.list_check_ins(id).await.map(|list| list.len()) }
        }))
        .buffer_unordered(MAX_CONCURRENT_REQUESTS)
        .collect()
        .await;

        let mut total_check_ins = 0;
        for count in counts {
            total_check_ins += count?;
        }

        Ok(HabitStats {
            active_habits: habits.len(),
            best_streak,
            total_check_ins,
        })
    }
}

/// Today in the device's local timezone. This is the date submitted to the
/// server and the one duplicate detection keys on.
fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

fn validate_title(title: &str) -> Result<(), ApiError> {
    if title.trim().is_empty() {
        return Err(ApiError::Validation {
            message: "Title is required".to_string(),
            details: None,
        });
    }
    Ok(())
}
