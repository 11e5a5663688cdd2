//! HTTP client for the Daystar REST API.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::CredentialStore;
use crate::models::{CheckIn, Habit, HabitDraft, UserProfile};

use super::{ApiError, AuthApi, AuthPayload, HabitsApi};

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// API client for the Daystar backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    store: Arc<CredentialStore>,
}

impl ApiClient {
    /// Create a client bound to one base endpoint, e.g.
    /// `https://api-daystar.onrender.com/api`.
    pub fn new(base_url: impl Into<String>, store: Arc<CredentialStore>) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            store,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send one request through the decoration and inspection stages.
    ///
    /// The credential is re-read from the store on every call so a
    /// just-cleared token is never reused. On 401/403 the store is cleared
    /// before the rejection propagates; flipping the session state is the
    /// session manager's job when it observes the failure.
    async fn dispatch(&self, request: RequestBuilder) -> Result<String, ApiError> {
        let token = self.store.read().await?;
        let request = attach_credential(request, token.as_deref());

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }

        let err = ApiError::from_status(status, &body);
        if err.is_auth_failure() {
            debug!("authorization failure, dropping stored credential");
            if let Err(store_err) = self.store.clear().await {
                warn!(error = %store_err, "failed to clear credential after 401/403");
            }
        }
        Err(err)
    }

    fn parse<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
        serde_json::from_str(body).map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let body = self.dispatch(self.http.get(self.url(path))).await?;
        Self::parse(&body)
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = self.dispatch(self.http.post(self.url(path)).json(body)).await?;
        Self::parse(&body)
    }

    async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = self.dispatch(self.http.put(self.url(path)).json(body)).await?;
        Self::parse(&body)
    }
}

/// Attach the bearer credential to an outgoing request, when one exists.
/// Kept as a free function so decoration is testable without a transport.
fn attach_credential(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

// ============================================================================
// Wire envelopes
// ============================================================================

#[derive(Debug, Deserialize)]
struct AuthEnvelope {
    success: bool,
    token: String,
    user: UserProfile,
}

impl AuthEnvelope {
    fn into_payload(self) -> Result<AuthPayload, ApiError> {
        if !self.success {
            return Err(ApiError::InvalidResponse(
                "auth response flagged success=false".to_string(),
            ));
        }
        Ok(AuthPayload {
            token: self.token,
            user: self.user,
        })
    }
}

#[derive(Debug, Deserialize)]
struct VerifyEnvelope {
    success: bool,
    valid: bool,
    #[serde(default)]
    user: Option<UserProfile>,
}

#[derive(Debug, Deserialize)]
struct ProfileEnvelope {
    #[allow(dead_code)]
    success: bool,
    user: UserProfile,
}

#[derive(Debug, Deserialize)]
struct HabitsEnvelope {
    #[allow(dead_code)]
    success: bool,
    habits: Vec<Habit>,
}

#[derive(Debug, Deserialize)]
struct HabitEnvelope {
    #[allow(dead_code)]
    success: bool,
    habit: Habit,
}

#[derive(Debug, Deserialize)]
struct CheckInsEnvelope {
    #[allow(dead_code)]
    success: bool,
    #[serde(rename = "checkIns")]
    check_ins: Vec<CheckIn>,
}

#[derive(Debug, Serialize)]
struct ProfileBody<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
}

// ============================================================================
// Endpoint implementations
// ============================================================================

impl AuthApi for ApiClient {
    async fn login_google(&self, id_token: &str) -> Result<AuthPayload, ApiError> {
        let envelope: AuthEnvelope = self
            .post("/auth/google", &serde_json::json!({ "idToken": id_token }))
            .await?;
        envelope.into_payload()
    }

    async fn login(&self, email: &str, password: &str) -> Result<AuthPayload, ApiError> {
        let envelope: AuthEnvelope = self
            .post(
                "/auth/login",
                &serde_json::json!({ "email": email, "password": password }),
            )
            .await?;
        envelope.into_payload()
    }

    async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<AuthPayload, ApiError> {
        let envelope: AuthEnvelope = self
            .post(
                "/auth/register",
                &serde_json::json!({ "email": email, "password": password, "name": name }),
            )
            .await?;
        envelope.into_payload()
    }

    async fn verify(&self) -> Result<UserProfile, ApiError> {
        let envelope: VerifyEnvelope = self.get("/auth/verify").await?;
        if !envelope.success || !envelope.valid {
            // The server answered 200 but declined the token.
            return Err(ApiError::Unauthorized { message: None });
        }
        envelope
            .user
            .ok_or_else(|| ApiError::InvalidResponse("verify response missing user".to_string()))
    }

    async fn update_profile(
        &self,
        name: &str,
        password: Option<&str>,
    ) -> Result<UserProfile, ApiError> {
        let envelope: ProfileEnvelope = self
            .put("/auth/profile", &ProfileBody { name, password })
            .await?;
        Ok(envelope.user)
    }
}

impl HabitsApi for ApiClient {
    async fn list_habits(&self) -> Result<Vec<Habit>, ApiError> {
        let envelope: HabitsEnvelope = self.get("/habits").await?;
        Ok(envelope.habits)
    }

    async fn create_habit(&self, draft: &HabitDraft) -> Result<Habit, ApiError> {
        let envelope: HabitEnvelope = self.post("/habits", draft).await?;
        Ok(envelope.habit)
    }

    async fn update_habit(&self, id: i64, draft: &HabitDraft) -> Result<Habit, ApiError> {
        let envelope: HabitEnvelope = self.put(&format!("/habits/{}", id), draft).await?;
        Ok(envelope.habit)
    }

    async fn check_in(&self, habit_id: i64, local_date: NaiveDate) -> Result<Habit, ApiError> {
        let envelope: HabitEnvelope = self
            .post(
                &format!("/habits/{}/checkin", habit_id),
                &serde_json::json!({ "localDate": local_date }),
            )
            .await?;
        Ok(envelope.habit)
    }

    async fn list_check_ins(&self, habit_id: i64) -> Result<Vec<CheckIn>, ApiError> {
        let envelope: CheckInsEnvelope = self.get(&format!("/habits/{}/checkins", habit_id)).await?;
        Ok(envelope.check_ins)
    }
}
