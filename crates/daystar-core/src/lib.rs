//! Core library for the Daystar habit tracker client.
//!
//! Daystar users sign in, create habits, and check in at most once per
//! habit per calendar day to build a streak. This crate is the session
//! and synchronization layer under the UI:
//!
//! - [`auth::CredentialStore`]: encrypted-at-rest persistence for the one
//!   opaque session token
//! - [`api::ApiClient`]: the single HTTP gateway; attaches the credential
//!   to every call and drops it on 401/403
//! - [`auth::SessionManager`]: the session state machine
//!   (`unknown → verifying → authenticated | unauthenticated`)
//! - [`habits::HabitSyncController`]: keeps the habit list and streaks in
//!   lockstep with the server, which is the single source of truth
//!
//! The server computes all derived state; after every mutation the client
//! re-fetches rather than patching local copies.

pub mod api;
pub mod auth;
pub mod config;
pub mod habits;
pub mod models;

#[cfg(test)]
mod testutil;

pub use api::{ApiClient, ApiError, AuthApi, AuthPayload, HabitsApi};
pub use auth::{CredentialStore, Session, SessionManager, SessionState, StoreError};
pub use config::Config;
pub use habits::{CheckInOutcome, HabitSyncController};
pub use models::{CheckIn, Habit, HabitDraft, HabitStats, UserProfile};
