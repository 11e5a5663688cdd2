use serde::{Deserialize, Serialize};

/// The authenticated account as the server reports it.
///
/// Replaced wholesale on every login/verify/profile-update response;
/// never merged field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub name: String,
    /// Avatar URL, present for Google-linked accounts.
    #[serde(default)]
    pub picture: Option<String>,
}
