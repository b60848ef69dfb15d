//! Collaborator traits consumed by the session manager. Both collaborators
//! are injected at construction so tests and frontends can substitute their
//! own implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::AppResult;

/// Identity-provider view of an account, distinct from the stored profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserHandle {
    pub id: String,
    pub email: String,
    pub email_verified: bool,
}

/// Broadcast on every provider-side session change. `user` is None when the
/// provider session ended.
#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub user: Option<UserHandle>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn create_account(&self, email: &str, password: &str) -> AppResult<UserHandle>;
    async fn sign_in(&self, email: &str, password: &str) -> AppResult<UserHandle>;
    async fn sign_out(&self) -> AppResult<()>;
    async fn send_password_reset(&self, email: &str) -> AppResult<()>;
    /// Complete an external OAuth handshake. `provider_tag` names the OAuth
    /// backend, e.g. "google".
    async fn sign_in_with_oauth(&self, provider_tag: &str) -> AppResult<UserHandle>;
    /// Subscribe to the provider's session-changed feed.
    fn session_events(&self) -> broadcast::Receiver<SessionEvent>;
}

/// Persisted user metadata, keyed by the identity-provider user id. The role
/// is stored as its string form so unknown values degrade to the default
/// role instead of failing deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub mobile_number: Option<String>,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn save_profile(&self, profile: &UserProfile) -> AppResult<()>;
    async fn fetch_profile(&self, id: &str) -> AppResult<Option<UserProfile>>;
}
