//! Authentication: credential persistence and the session state machine.
//!
//! This module provides:
//! - `CredentialStore`: encrypted-at-rest storage for the one opaque
//!   session token, keyed through the OS keychain
//! - `SessionManager`: owner of the process-wide `Session` and the
//!   login/verify/logout operations that move it between states

pub mod credentials;
pub mod session;

pub use credentials::{CredentialStore, StoreError};
pub use session::{Session, SessionManager, SessionState};
