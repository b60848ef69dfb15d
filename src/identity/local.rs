//! In-memory identity provider and profile store. These back the demo binary
//! and double as the reference implementations for tests; passwords are held
//! as Argon2 PHC strings, never in the clear.

use std::collections::HashMap;

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use parking_lot::RwLock;
use password_hash::{PasswordHash, SaltString};
use tokio::sync::broadcast;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

use super::provider::{IdentityProvider, ProfileStore, SessionEvent, UserHandle, UserProfile};

#[derive(Debug, thiserror::Error)]
enum LocalAuthError {
    #[error("an account already exists for '{0}'")]
    EmailTaken(String),
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("no account registered for '{0}'")]
    UnknownEmail(String),
}

impl From<LocalAuthError> for AppError {
    fn from(e: LocalAuthError) -> Self {
        let code = match e {
            LocalAuthError::EmailTaken(_) => "email_taken",
            LocalAuthError::InvalidCredentials => "invalid_credentials",
            LocalAuthError::UnknownEmail(_) => "unknown_email",
        };
        AppError::auth(code.to_string(), e.to_string())
    }
}

#[derive(Debug, Clone)]
struct Account {
    id: String,
    email: String,
    password_phc: String,
    email_verified: bool,
}

impl Account {
    fn handle(&self) -> UserHandle {
        UserHandle { id: self.id.clone(), email: self.email.clone(), email_verified: self.email_verified }
    }
}

pub struct LocalIdentityProvider {
    // Keyed by lowercase email.
    accounts: RwLock<HashMap<String, Account>>,
    events: broadcast::Sender<SessionEvent>,
}

impl LocalIdentityProvider {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);
        Self { accounts: RwLock::new(HashMap::new()), events }
    }

    fn hash_password(password: &str) -> AppResult<String> {
        let mut salt_bytes = [0u8; 16];
        getrandom::getrandom(&mut salt_bytes)
            .map_err(|e| AppError::internal("salt_failed".to_string(), e.to_string()))?;
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| AppError::internal("salt_failed".to_string(), e.to_string()))?;
        let argon2 = Argon2::default();
        let phc = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::internal("hash_failed".to_string(), e.to_string()))?
            .to_string();
        Ok(phc)
    }

    fn verify_password(phc: &str, password: &str) -> bool {
        if let Ok(parsed) = PasswordHash::new(phc) {
            Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
        } else { false }
    }

    fn emit(&self, user: Option<UserHandle>) {
        // No subscribers is fine; the feed is best-effort.
        let _ = self.events.send(SessionEvent { user });
    }
}

impl Default for LocalIdentityProvider {
    fn default() -> Self { Self::new() }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn create_account(&self, email: &str, password: &str) -> AppResult<UserHandle> {
        let key = email.to_ascii_lowercase();
        let handle = {
            let mut accounts = self.accounts.write();
            if accounts.contains_key(&key) {
                return Err(LocalAuthError::EmailTaken(email.to_string()).into());
            }
            let account = Account {
                id: Uuid::new_v4().to_string(),
                email: email.to_string(),
                password_phc: Self::hash_password(password)?,
                email_verified: false,
            };
            let handle = account.handle();
            accounts.insert(key, account);
            handle
        };
        info!(user_id = %handle.id, "local account created");
        self.emit(Some(handle.clone()));
        Ok(handle)
    }

    async fn sign_in(&self, email: &str, password: &str) -> AppResult<UserHandle> {
        let key = email.to_ascii_lowercase();
        let handle = {
            let accounts = self.accounts.read();
            let Some(account) = accounts.get(&key) else {
                return Err(LocalAuthError::InvalidCredentials.into());
            };
            if !Self::verify_password(&account.password_phc, password) {
                return Err(LocalAuthError::InvalidCredentials.into());
            }
            account.handle()
        };
        self.emit(Some(handle.clone()));
        Ok(handle)
    }

    async fn sign_out(&self) -> AppResult<()> {
        self.emit(None);
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> AppResult<()> {
        let key = email.to_ascii_lowercase();
        if !self.accounts.read().contains_key(&key) {
            return Err(LocalAuthError::UnknownEmail(email.to_string()).into());
        }
        // Delivery belongs to a mail collaborator; the local provider only
        // acknowledges the request.
        info!(email, "password reset acknowledged");
        Ok(())
    }

    async fn sign_in_with_oauth(&self, provider_tag: &str) -> AppResult<UserHandle> {
        // Stand-in for the external handshake: provision (or reuse) a
        // verified account keyed by a synthetic address for the tag.
        let email = format!("{provider_tag}.user@oauth.local");
        let key = email.to_ascii_lowercase();
        let handle = {
            let mut accounts = self.accounts.write();
            let account = accounts.entry(key).or_insert_with(|| Account {
                id: Uuid::new_v4().to_string(),
                email: email.clone(),
                password_phc: String::new(),
                email_verified: true,
            });
            account.handle()
        };
        self.emit(Some(handle.clone()));
        Ok(handle)
    }

    fn session_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

pub struct InMemoryProfileStore {
    profiles: RwLock<HashMap<String, UserProfile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self { Self { profiles: RwLock::new(HashMap::new()) } }

    pub fn len(&self) -> usize { self.profiles.read().len() }
    pub fn is_empty(&self) -> bool { self.profiles.read().is_empty() }
}

impl Default for InMemoryProfileStore {
    fn default() -> Self { Self::new() }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn save_profile(&self, profile: &UserProfile) -> AppResult<()> {
        self.profiles.write().insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    async fn fetch_profile(&self, id: &str) -> AppResult<Option<UserProfile>> {
        Ok(self.profiles.read().get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_sign_in() {
        let provider = LocalIdentityProvider::new();
        let created = provider.create_account("alice@example.org", "s3cr3t!").await.unwrap();
        let signed = provider.sign_in("Alice@Example.org", "s3cr3t!").await.unwrap();
        assert_eq!(created.id, signed.id);
        assert!(!signed.email_verified);
    }

    #[tokio::test]
    async fn duplicate_email_rejected() {
        let provider = LocalIdentityProvider::new();
        provider.create_account("alice@example.org", "s3cr3t!").await.unwrap();
        let err = provider.create_account("ALICE@example.org", "other1").await.unwrap_err();
        assert_eq!(err.code_str(), "email_taken");
    }

    #[tokio::test]
    async fn wrong_password_rejected() {
        let provider = LocalIdentityProvider::new();
        provider.create_account("alice@example.org", "s3cr3t!").await.unwrap();
        let err = provider.sign_in("alice@example.org", "wrong!").await.unwrap_err();
        assert_eq!(err.code_str(), "invalid_credentials");
    }

    #[tokio::test]
    async fn oauth_provisioning_is_idempotent() {
        let provider = LocalIdentityProvider::new();
        let first = provider.sign_in_with_oauth("google").await.unwrap();
        let second = provider.sign_in_with_oauth("google").await.unwrap();
        assert_eq!(first.id, second.id);
        assert!(first.email_verified);
    }

    #[tokio::test]
    async fn events_fire_on_sign_in_and_out() {
        let provider = LocalIdentityProvider::new();
        let mut rx = provider.session_events();
        provider.create_account("alice@example.org", "s3cr3t!").await.unwrap();
        assert!(rx.recv().await.unwrap().user.is_some());
        provider.sign_out().await.unwrap();
        assert!(rx.recv().await.unwrap().user.is_none());
    }

    #[tokio::test]
    async fn reset_requires_known_account() {
        let provider = LocalIdentityProvider::new();
        let err = provider.send_password_reset("ghost@example.org").await.unwrap_err();
        assert_eq!(err.code_str(), "unknown_email");
    }
}
