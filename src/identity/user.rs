use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Access tier deciding which dashboard variant a user sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Government,
    Researcher,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Government => "government",
            UserRole::Researcher => "researcher",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            UserRole::Admin => "Administrator",
            UserRole::Government => "Government Official",
            UserRole::Researcher => "Researcher",
        }
    }

    pub fn parse(s: &str) -> Option<UserRole> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(UserRole::Admin),
            "government" => Some(UserRole::Government),
            "researcher" => Some(UserRole::Researcher),
            _ => None,
        }
    }

    pub fn all() -> &'static [UserRole] {
        &[UserRole::Admin, UserRole::Government, UserRole::Researcher]
    }
}

/// Authenticated user as seen by the application. Immutable; replaced
/// wholesale whenever the profile is re-derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub mobile_number: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub email_verified: bool,
}
