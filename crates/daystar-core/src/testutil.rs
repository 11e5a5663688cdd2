//! In-memory stand-in for the backend plus the gateway's store side
//! effects, used by session and sync tests.
//!
//! The fake honors the same contract the real `ApiClient` provides to its
//! callers: requests authenticate against whatever token the shared
//! `CredentialStore` currently holds, and an authorization failure clears
//! that store before the error is returned.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, Utc};

use crate::api::{ApiError, AuthApi, AuthPayload, HabitsApi};
use crate::auth::CredentialStore;
use crate::models::{CheckIn, Habit, HabitDraft, UserProfile};

#[derive(Clone)]
struct Account {
    password: String,
    user: UserProfile,
}

#[derive(Default)]
struct State {
    accounts: HashMap<String, Account>,
    identity_tokens: HashMap<String, String>,
    sessions: HashMap<String, String>,
    habits: Vec<Habit>,
    check_ins: Vec<CheckIn>,
    next_user_id: i64,
    next_habit_id: i64,
    next_check_in_id: i64,
    next_token: i64,
}

pub struct FakeApi {
    pub store: Arc<CredentialStore>,
    state: Mutex<State>,
    habit_calls: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            store: Arc::new(CredentialStore::in_memory()),
            state: Mutex::new(State::default()),
            habit_calls: AtomicUsize::new(0),
        }
    }

    pub fn add_account(&self, email: &str, password: &str, name: &str) {
        let mut state = self.state.lock().unwrap();
        state.next_user_id += 1;
        let user = UserProfile {
            id: state.next_user_id.to_string(),
            email: email.to_string(),
            name: name.to_string(),
            picture: None,
        };
        state.accounts.insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                user,
            },
        );
    }

    /// Register a server-side session for an existing or implicit account
    /// and return its token, as if a login happened on another device.
    pub fn issue_session(&self, email: &str, name: &str) -> String {
        {
            let state = self.state.lock().unwrap();
            let known = state.accounts.contains_key(email);
            drop(state);
            if !known {
                self.add_account(email, "", name);
            }
        }
        let mut state = self.state.lock().unwrap();
        state.next_token += 1;
        let token = format!("tok-{}", state.next_token);
        state.sessions.insert(token.clone(), email.to_string());
        token
    }

    pub fn accept_identity_token(&self, id_token: &str, email: &str, name: &str) {
        self.add_account(email, "", name);
        let mut state = self.state.lock().unwrap();
        state
            .identity_tokens
            .insert(id_token.to_string(), email.to_string());
    }

    /// Invalidate every issued session, as a server-side revocation would.
    pub fn revoke_all_sessions(&self) {
        self.state.lock().unwrap().sessions.clear();
    }

    /// Overwrite a habit's server-side streak.
    pub fn backdate_streak(&self, habit_id: i64, streak: u32) {
        let mut state = self.state.lock().unwrap();
        if let Some(habit) = state.habits.iter_mut().find(|h| h.id == habit_id) {
            habit.streak = streak;
        }
    }

    pub fn saw_any_habit_call(&self) -> bool {
        self.habit_calls.load(Ordering::SeqCst) > 0
    }

    fn mint_session(&self, email: &str) -> AuthPayload {
        let mut state = self.state.lock().unwrap();
        state.next_token += 1;
        let token = format!("tok-{}", state.next_token);
        state.sessions.insert(token.clone(), email.to_string());
        let user = state.accounts[email].user.clone();
        AuthPayload { token, user }
    }

    /// Resolve the caller from the shared store, clearing it on rejection
    /// the way the gateway does on 401/403.
    async fn authenticate(&self) -> Result<String, ApiError> {
        let token = self.store.read().await?;
        let email = {
            let state = self.state.lock().unwrap();
            token.and_then(|t| state.sessions.get(&t).cloned())
        };
        match email {
            Some(email) => Ok(email),
            None => {
                self.store.clear().await?;
                Err(ApiError::Unauthorized { message: None })
            }
        }
    }

    fn password_problems(password: &str) -> Vec<String> {
        let mut problems = Vec::new();
        if password.len() < 6 {
            problems.push("Password must be at least 6 characters long".to_string());
        }
        if !password.chars().any(|c| c.is_ascii_uppercase()) {
            problems.push("Password must contain at least 1 uppercase letter".to_string());
        }
        if !password.chars().any(|c| c.is_ascii_lowercase()) {
            problems.push("Password must contain at least 1 lowercase letter".to_string());
        }
        problems
    }
}

impl AuthApi for FakeApi {
    async fn login_google(&self, id_token: &str) -> Result<AuthPayload, ApiError> {
        let email = {
            let state = self.state.lock().unwrap();
            state.identity_tokens.get(id_token).cloned()
        };
        match email {
            Some(email) => Ok(self.mint_session(&email)),
            None => Err(ApiError::Validation {
                message: "Google sign-in failed".to_string(),
                details: None,
            }),
        }
    }

    async fn login(&self, email: &str, password: &str) -> Result<AuthPayload, ApiError> {
        let matches = {
            let state = self.state.lock().unwrap();
            state
                .accounts
                .get(email)
                .is_some_and(|account| account.password == password && !password.is_empty())
        };
        if !matches {
            self.store.clear().await?;
            return Err(ApiError::Unauthorized {
                message: Some("Invalid email or password".to_string()),
            });
        }
        Ok(self.mint_session(email))
    }

    async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<AuthPayload, ApiError> {
        let problems = Self::password_problems(password);
        if !problems.is_empty() {
            return Err(ApiError::Validation {
                message: "Password does not meet requirements".to_string(),
                details: Some(serde_json::json!({ "password": problems })),
            });
        }
        {
            let state = self.state.lock().unwrap();
            if state.accounts.contains_key(email) {
                return Err(ApiError::Validation {
                    message: "Email already registered".to_string(),
                    details: None,
                });
            }
        }
        self.add_account(email, password, name);
        Ok(self.mint_session(email))
    }

    async fn verify(&self) -> Result<UserProfile, ApiError> {
        let email = self.authenticate().await?;
        let state = self.state.lock().unwrap();
        Ok(state.accounts[&email].user.clone())
    }

    async fn update_profile(
        &self,
        name: &str,
        password: Option<&str>,
    ) -> Result<UserProfile, ApiError> {
        let email = self.authenticate().await?;
        if let Some(password) = password {
            let problems = Self::password_problems(password);
            if !problems.is_empty() {
                return Err(ApiError::Validation {
                    message: "Password does not meet requirements".to_string(),
                    details: Some(serde_json::json!({ "password": problems })),
                });
            }
        }
        let mut state = self.state.lock().unwrap();
        let account = state.accounts.get_mut(&email).unwrap();
        account.user.name = name.to_string();
        if let Some(password) = password {
            account.password = password.to_string();
        }
        Ok(account.user.clone())
    }
}

impl HabitsApi for FakeApi {
    async fn list_habits(&self) -> Result<Vec<Habit>, ApiError> {
        self.habit_calls.fetch_add(1, Ordering::SeqCst);
        self.authenticate().await?;
        Ok(self.state.lock().unwrap().habits.clone())
    }

    async fn create_habit(&self, draft: &HabitDraft) -> Result<Habit, ApiError> {
        self.habit_calls.fetch_add(1, Ordering::SeqCst);
        self.authenticate().await?;
        let mut state = self.state.lock().unwrap();
        state.next_habit_id += 1;
        let habit = Habit {
            id: state.next_habit_id,
            title: draft.title.clone(),
            description: draft.description.clone(),
            icon: draft.icon.clone(),
            colour: draft.colour.clone(),
            streak: 0,
            created_at: Utc::now(),
        };
        state.habits.push(habit.clone());
        Ok(habit)
    }

    async fn update_habit(&self, id: i64, draft: &HabitDraft) -> Result<Habit, ApiError> {
        self.habit_calls.fetch_add(1, Ordering::SeqCst);
        self.authenticate().await?;
        let mut state = self.state.lock().unwrap();
        let Some(habit) = state.habits.iter_mut().find(|h| h.id == id) else {
            return Err(ApiError::Validation {
                message: "Habit not found".to_string(),
                details: None,
            });
        };
        habit.title = draft.title.clone();
        habit.description = draft.description.clone();
        habit.icon = draft.icon.clone();
        habit.colour = draft.colour.clone();
        Ok(habit.clone())
    }

    async fn check_in(&self, habit_id: i64, local_date: NaiveDate) -> Result<Habit, ApiError> {
        self.habit_calls.fetch_add(1, Ordering::SeqCst);
        self.authenticate().await?;
        let mut state = self.state.lock().unwrap();
        let duplicate = state
            .check_ins
            .iter()
            .any(|c| c.habit_id == Some(habit_id) && c.check_in_date == local_date);
        if duplicate {
            return Err(ApiError::Validation {
                message: "You already checked in today".to_string(),
                details: None,
            });
        }
        if !state.habits.iter().any(|h| h.id == habit_id) {
            return Err(ApiError::Validation {
                message: "Habit not found".to_string(),
                details: None,
            });
        }
        state.next_check_in_id += 1;
        let check_in = CheckIn {
            id: state.next_check_in_id,
            habit_id: Some(habit_id),
            check_in_date: local_date,
            image_url: None,
            created_at: Utc::now(),
        };
        state.check_ins.push(check_in);
        let habit = state
            .habits
            .iter_mut()
            .find(|h| h.id == habit_id)
            .expect("habit checked above");
        habit.streak += 1;
        Ok(habit.clone())
    }

    async fn list_check_ins(&self, habit_id: i64) -> Result<Vec<CheckIn>, ApiError> {
        self.habit_calls.fetch_add(1, Ordering::SeqCst);
        self.authenticate().await?;
        let state = self.state.lock().unwrap();
        Ok(state
            .check_ins
            .iter()
            .filter(|c| c.habit_id == Some(habit_id))
            .cloned()
            .collect())
    }
}
