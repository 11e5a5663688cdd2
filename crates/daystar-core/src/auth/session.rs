//! Session state machine and the operations that drive it.
//!
//! Exactly one live [`Session`] exists per process. It is owned by the
//! [`SessionManager`] and published through a watch channel; every other
//! component reads snapshots and never mutates it.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{ApiError, AuthApi, AuthPayload};
use crate::auth::CredentialStore;
use crate::models::UserProfile;

/// Where the client currently stands with the backend.
///
/// `Unknown` and `Verifying` are transient and only reachable through
/// [`SessionManager::bootstrap`]; `Authenticated` and `Unauthenticated`
/// are the only resting states. Consumers must treat the transient states
/// as "not yet decided" and hold off dependent work until settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unknown,
    Verifying,
    Authenticated,
    Unauthenticated,
}

/// The client's belief about who is signed in.
///
/// Fields are private so the invariants hold by construction: `token` is
/// present iff the state is `Authenticated`, and `user` is present iff
/// `token` is.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    state: SessionState,
    token: Option<String>,
    user: Option<UserProfile>,
}

impl Session {
    fn unknown() -> Self {
        Self {
            state: SessionState::Unknown,
            token: None,
            user: None,
        }
    }

    fn verifying() -> Self {
        Self {
            state: SessionState::Verifying,
            token: None,
            user: None,
        }
    }

    fn unauthenticated() -> Self {
        Self {
            state: SessionState::Unauthenticated,
            token: None,
            user: None,
        }
    }

    fn authenticated(token: String, user: UserProfile) -> Self {
        Self {
            state: SessionState::Authenticated,
            token: Some(token),
            user: Some(user),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    /// True once the state machine has left the transient startup states.
    pub fn is_settled(&self) -> bool {
        matches!(
            self.state,
            SessionState::Authenticated | SessionState::Unauthenticated
        )
    }
}

/// Owns the process-wide session and the credential it stands on.
///
/// Every operation is atomic from the caller's perspective: it either
/// fully succeeds, updating both the session and the credential store, or
/// fails leaving both as they were. The one deliberate exception is an
/// observed authorization failure, which always settles the session to
/// `Unauthenticated` because the gateway has already dropped the
/// credential.
pub struct SessionManager<A> {
    api: Arc<A>,
    store: Arc<CredentialStore>,
    sessions: watch::Sender<Session>,
}

impl<A: AuthApi> SessionManager<A> {
    pub fn new(api: Arc<A>, store: Arc<CredentialStore>) -> Self {
        let (sessions, _) = watch::channel(Session::unknown());
        Self {
            api,
            store,
            sessions,
        }
    }

    /// Current session snapshot.
    pub fn snapshot(&self) -> Session {
        self.sessions.borrow().clone()
    }

    /// Observe session transitions. The receiver always yields the latest
    /// snapshot; intermediate states may be skipped under load.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.sessions.subscribe()
    }

    fn publish(&self, session: Session) -> Session {
        self.sessions.send_replace(session.clone());
        session
    }

    /// Run once at startup: decide who we are from the persisted
    /// credential. Every code path terminates in a settled state.
    pub async fn bootstrap(&self) -> Session {
        let stored = match self.store.read().await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "credential store unreadable at startup");
                if let Err(clear_err) = self.store.clear().await {
                    warn!(error = %clear_err, "failed to clear unreadable credential");
                }
                return self.publish(Session::unauthenticated());
            }
        };

        let Some(token) = stored else {
            debug!("no stored credential");
            return self.publish(Session::unauthenticated());
        };

        self.publish(Session::verifying());
        match self.api.verify().await {
            Ok(user) => {
                info!(email = %user.email, "stored session verified");
                self.publish(Session::authenticated(token, user))
            }
            Err(e) => {
                info!(error = %e, "stored session rejected");
                if let Err(clear_err) = self.store.clear().await {
                    warn!(error = %clear_err, "failed to clear rejected credential");
                }
                self.publish(Session::unauthenticated())
            }
        }
    }

    /// Exchange a Google identity token for a session.
    pub async fn login_with_identity_token(&self, id_token: &str) -> Result<Session, ApiError> {
        let payload = self.observing(self.api.login_google(id_token).await)?;
        self.complete_login(payload).await
    }

    /// Email/password login. On failure the server's message propagates
    /// verbatim and the session is left as it was.
    pub async fn login_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, ApiError> {
        let payload = self.observing(self.api.login(email, password).await)?;
        self.complete_login(payload).await
    }

    /// Create an account and sign in. Password policy is enforced by the
    /// server; its validation payload propagates untouched.
    pub async fn signup(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Session, ApiError> {
        let payload = self.observing(self.api.register(email, password, name).await)?;
        self.complete_login(payload).await
    }

    /// Replace the profile on the server, then mirror it in the session.
    /// Requires an authenticated session; the token never changes here.
    pub async fn update_profile(
        &self,
        name: &str,
        password: Option<&str>,
    ) -> Result<Session, ApiError> {
        let current = self.snapshot();
        let Some(token) = current.token() else {
            return Err(ApiError::Unauthorized { message: None });
        };
        let token = token.to_string();

        let user = self.observing(self.api.update_profile(name, password).await)?;
        Ok(self.publish(Session::authenticated(token, user)))
    }

    /// Drop the credential and settle `Unauthenticated`. Local-first: no
    /// network involved, so it works offline. A store failure still
    /// surfaces, but the in-memory session is torn down regardless.
    pub async fn logout(&self) -> Result<Session, ApiError> {
        let cleared = self.store.clear().await;
        let session = self.publish(Session::unauthenticated());
        cleared?;
        info!("signed out");
        Ok(session)
    }

    /// Persist the token, then settle `Authenticated`. Ordering matters:
    /// if persistence fails the session must not claim a credential the
    /// store does not hold.
    async fn complete_login(&self, payload: AuthPayload) -> Result<Session, ApiError> {
        self.store.save(&payload.token).await?;
        info!(email = %payload.user.email, "signed in");
        Ok(self.publish(Session::authenticated(payload.token, payload.user)))
    }

    /// Pass a gateway result through, settling `Unauthenticated` first if
    /// it reports an authorization failure - the gateway has already
    /// cleared the store by then, so keeping a token in the session would
    /// orphan it.
    fn observing<T>(&self, result: Result<T, ApiError>) -> Result<T, ApiError> {
        if let Err(e) = &result {
            if e.is_auth_failure() {
                self.publish(Session::unauthenticated());
            }
        }
        result
    }
}
