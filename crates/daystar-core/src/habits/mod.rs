//! Habit synchronization: the local read cache and the mutations that
//! keep it honest.
//!
//! The server owns every habit and every streak value. This module's
//! controller fetches, mutates, and re-fetches; it never patches the
//! cache in place and never computes a streak of its own.

pub mod sync;

pub use sync::{CheckInOutcome, HabitSyncController};
