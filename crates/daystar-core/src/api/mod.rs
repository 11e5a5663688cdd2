//! REST gateway for the Daystar backend.
//!
//! This module provides the `ApiClient`, the single configured HTTP client
//! every component calls through. Two behaviors wrap every request:
//!
//! - request decoration: the current credential is read from the store on
//!   every dispatch and attached as a bearer header
//! - response inspection: a 401/403 clears the stored credential before
//!   the failure reaches the caller
//!
//! The `AuthApi`/`HabitsApi` traits are the seams the session manager and
//! sync controller call through; tests substitute in-memory fakes.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;

use chrono::NaiveDate;

use crate::models::{CheckIn, Habit, HabitDraft, UserProfile};

/// Successful login/signup response: the session token plus the profile
/// the server resolved for it.
#[derive(Debug, Clone)]
pub struct AuthPayload {
    pub token: String,
    pub user: UserProfile,
}

/// Authentication endpoints, fixed by the backend's contract.
#[allow(async_fn_in_trait)]
pub trait AuthApi {
    /// `POST /auth/google` with a Google identity token.
    async fn login_google(&self, id_token: &str) -> Result<AuthPayload, ApiError>;

    /// `POST /auth/login`.
    async fn login(&self, email: &str, password: &str) -> Result<AuthPayload, ApiError>;

    /// `POST /auth/register`.
    async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<AuthPayload, ApiError>;

    /// `GET /auth/verify` using the stored credential.
    async fn verify(&self) -> Result<UserProfile, ApiError>;

    /// `PUT /auth/profile`. `password` of `None` keeps the current one.
    async fn update_profile(
        &self,
        name: &str,
        password: Option<&str>,
    ) -> Result<UserProfile, ApiError>;
}

/// Habit and check-in endpoints.
#[allow(async_fn_in_trait)]
pub trait HabitsApi {
    /// `GET /habits`.
    async fn list_habits(&self) -> Result<Vec<Habit>, ApiError>;

    /// `POST /habits`.
    async fn create_habit(&self, draft: &HabitDraft) -> Result<Habit, ApiError>;

    /// `PUT /habits/:id`.
    async fn update_habit(&self, id: i64, draft: &HabitDraft) -> Result<Habit, ApiError>;

    /// `POST /habits/:id/checkin` for the given calendar date. The server
    /// decides whether the date already has a check-in.
    async fn check_in(&self, habit_id: i64, local_date: NaiveDate) -> Result<Habit, ApiError>;

    /// `GET /habits/:id/checkins`.
    async fn list_check_ins(&self, habit_id: i64) -> Result<Vec<CheckIn>, ApiError>;
}
