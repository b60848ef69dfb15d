//! Session state machine mediating between form input, the identity provider
//! and the profile store. All transitions funnel through a single watch
//! channel so consumers never observe half-set fields; the provider's session
//! feed remains the canonical source of truth and the UI-triggered flows only
//! fast-path it.

use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use crate::config::Settings;
use crate::error::{AppError, AppResult};

use super::provider::{IdentityProvider, ProfileStore, SessionEvent, UserHandle, UserProfile};
use super::user::{User, UserRole};
use super::validate::{validate_email, validate_mobile, validate_password};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthPhase {
    Unauthenticated,
    Authenticating,
    Authenticated,
}

/// Transient form fields and UI toggles. Cleared wholesale on sign-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormState {
    pub login_email: String,
    pub login_password: String,
    pub remember_me: bool,
    pub signup_email: String,
    pub signup_password: String,
    pub signup_mobile: String,
    pub selected_role: UserRole,
    pub login_mode: bool,
    pub show_password: bool,
    pub show_signup_password: bool,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            login_email: String::new(),
            login_password: String::new(),
            remember_me: false,
            signup_email: String::new(),
            signup_password: String::new(),
            signup_mobile: String::new(),
            selected_role: UserRole::Researcher,
            login_mode: true,
            show_password: false,
            show_signup_password: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub phase: AuthPhase,
    pub user: Option<User>,
    pub loading: bool,
    pub error: Option<String>,
    pub form: FormState,
}

impl SessionState {
    fn initial() -> Self {
        Self {
            phase: AuthPhase::Unauthenticated,
            user: None,
            loading: false,
            error: None,
            form: FormState::default(),
        }
    }

    pub fn is_authenticated(&self) -> bool { self.phase == AuthPhase::Authenticated }
}

pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    profiles: Arc<dyn ProfileStore>,
    state_tx: watch::Sender<SessionState>,
    settings: Settings,
}

impl SessionManager {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        profiles: Arc<dyn ProfileStore>,
        settings: Settings,
    ) -> Self {
        let (state_tx, _) = watch::channel(SessionState::initial());
        Self { provider, profiles, state_tx, settings }
    }

    /// Subscribe to session transitions. Every write is a complete state, so
    /// receivers can render directly from the borrowed value.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> { self.state_tx.subscribe() }

    pub fn state(&self) -> SessionState { self.state_tx.borrow().clone() }

    /// Mutate the transient form fields in place.
    pub fn update_form(&self, f: impl FnOnce(&mut FormState)) {
        self.state_tx.send_modify(|s| f(&mut s.form));
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AppResult<User> {
        if let Err(e) = validate_email(email).and_then(|_| validate_password(password)) {
            self.set_error(&e);
            return Err(e);
        }
        self.begin_attempt()?;
        let handle = match self
            .with_timeout("provider_sign_in", self.provider.sign_in(email, password))
            .await
        {
            Ok(h) => h,
            Err(e) => {
                warn!(error = %e, "sign-in rejected");
                self.set_failed(&e);
                return Err(e);
            }
        };
        self.finish_with_handle(&handle).await
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        mobile: &str,
        role: UserRole,
    ) -> AppResult<User> {
        if let Err(e) = validate_email(email)
            .and_then(|_| validate_password(password))
            .and_then(|_| validate_mobile(mobile))
        {
            self.set_error(&e);
            return Err(e);
        }
        self.begin_attempt()?;
        let handle = match self
            .with_timeout("provider_create_account", self.provider.create_account(email, password))
            .await
        {
            Ok(h) => h,
            Err(e) => {
                warn!(error = %e, "account creation rejected");
                self.set_failed(&e);
                return Err(e);
            }
        };
        let profile = UserProfile {
            id: handle.id.clone(),
            email: email.to_string(),
            mobile_number: Some(mobile.to_string()),
            role: role.as_str().to_string(),
            created_at: Utc::now(),
        };
        if let Err(e) = self.with_timeout("profile_save", self.profiles.save_profile(&profile)).await {
            // The provider account now exists without a profile; the observer
            // reconciles with the default role on the next session event.
            warn!(user_id = %handle.id, error = %e, "profile save failed after account creation");
            self.set_failed(&e);
            return Err(e);
        }
        let user = User {
            id: handle.id.clone(),
            email: profile.email,
            mobile_number: profile.mobile_number,
            role,
            created_at: profile.created_at,
            email_verified: handle.email_verified,
        };
        self.set_authenticated(user.clone());
        Ok(user)
    }

    pub async fn sign_in_with_google(&self) -> AppResult<User> {
        self.begin_attempt()?;
        let handle = match self
            .with_timeout("oauth_sign_in", self.provider.sign_in_with_oauth("google"))
            .await
        {
            Ok(h) => h,
            Err(e) => {
                warn!(error = %e, "google sign-in failed");
                self.set_failed(&e);
                return Err(e);
            }
        };
        // First OAuth login lazily provisions a profile with the default role.
        let existing = match self
            .with_timeout("profile_fetch", self.profiles.fetch_profile(&handle.id))
            .await
        {
            Ok(p) => p,
            Err(e) => {
                self.set_failed(&e);
                return Err(e);
            }
        };
        if existing.is_none() {
            let profile = UserProfile {
                id: handle.id.clone(),
                email: handle.email.clone(),
                mobile_number: None,
                role: self.settings.default_role.as_str().to_string(),
                created_at: Utc::now(),
            };
            if let Err(e) = self.with_timeout("profile_save", self.profiles.save_profile(&profile)).await {
                self.set_failed(&e);
                return Err(e);
            }
        }
        self.finish_with_handle(&handle).await
    }

    /// Provider sign-out. Local state clears unconditionally even when the
    /// provider call fails: its session feed is the source of truth from
    /// here on, so holding stale local auth would only mask the error.
    pub async fn sign_out(&self) -> AppResult<()> {
        let result = self.with_timeout("provider_sign_out", self.provider.sign_out()).await;
        let err_msg = result.as_ref().err().map(|e| e.message().to_string());
        self.state_tx.send_modify(|s| {
            *s = SessionState::initial();
            s.error = err_msg.clone();
        });
        match &result {
            Ok(()) => info!("session cleared"),
            Err(e) => warn!(error = %e, "provider sign-out failed; local session cleared anyway"),
        }
        result
    }

    pub async fn send_password_reset(&self, email: &str) -> AppResult<()> {
        if let Err(e) = validate_email(email) {
            self.set_error(&e);
            return Err(e);
        }
        self.with_timeout("password_reset", self.provider.send_password_reset(email)).await
    }

    /// Drive session state from the provider's session feed until the
    /// provider drops its sender. Spawn this once per manager; it is the
    /// canonical state source and UI flows merely anticipate it.
    pub async fn run_observer(&self) {
        let mut events = self.provider.session_events();
        loop {
            match events.recv().await {
                Ok(SessionEvent { user: Some(handle) }) => {
                    match self.user_from_handle(&handle).await {
                        Ok(user) => self.set_authenticated(user),
                        Err(e) => {
                            warn!(user_id = %handle.id, error = %e, "profile re-derivation failed");
                            self.set_failed(&e);
                        }
                    }
                }
                Ok(SessionEvent { user: None }) => {
                    self.state_tx.send_modify(|s| *s = SessionState::initial());
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "session event feed lagged; resuming with latest");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    // --- transitions; every write goes through state_tx ---

    fn begin_attempt(&self) -> AppResult<()> {
        let mut denied = false;
        self.state_tx.send_modify(|s| {
            if s.phase == AuthPhase::Authenticating {
                denied = true;
                return;
            }
            s.phase = AuthPhase::Authenticating;
            s.loading = true;
            s.error = None;
        });
        if denied {
            return Err(AppError::auth(
                "auth_in_progress",
                "another sign-in attempt is already running",
            ));
        }
        Ok(())
    }

    fn set_authenticated(&self, user: User) {
        info!(user_id = %user.id, role = user.role.as_str(), "session authenticated");
        self.state_tx.send_modify(|s| {
            s.phase = AuthPhase::Authenticated;
            s.user = Some(user);
            s.loading = false;
            s.error = None;
        });
    }

    fn set_failed(&self, err: &AppError) {
        self.state_tx.send_modify(|s| {
            s.phase = AuthPhase::Unauthenticated;
            s.user = None;
            s.loading = false;
            s.error = Some(err.message().to_string());
        });
    }

    fn set_error(&self, err: &AppError) {
        self.state_tx.send_modify(|s| s.error = Some(err.message().to_string()));
    }

    async fn finish_with_handle(&self, handle: &UserHandle) -> AppResult<User> {
        match self.user_from_handle(handle).await {
            Ok(user) => {
                self.set_authenticated(user.clone());
                Ok(user)
            }
            Err(e) => {
                self.set_failed(&e);
                Err(e)
            }
        }
    }

    /// Re-derive the application user from a provider handle. A missing
    /// profile falls back to the configured default role rather than failing,
    /// which also reconciles accounts whose profile write was lost.
    async fn user_from_handle(&self, handle: &UserHandle) -> AppResult<User> {
        let profile = self
            .with_timeout("profile_fetch", self.profiles.fetch_profile(&handle.id))
            .await?;
        Ok(match profile {
            Some(p) => User {
                id: handle.id.clone(),
                email: p.email,
                mobile_number: p.mobile_number,
                role: UserRole::parse(&p.role).unwrap_or(self.settings.default_role),
                created_at: p.created_at,
                email_verified: handle.email_verified,
            },
            None => User {
                id: handle.id.clone(),
                email: handle.email.clone(),
                mobile_number: None,
                role: self.settings.default_role,
                created_at: Utc::now(),
                email_verified: handle.email_verified,
            },
        })
    }

    async fn with_timeout<T>(
        &self,
        what: &str,
        fut: impl Future<Output = AppResult<T>>,
    ) -> AppResult<T> {
        match tokio::time::timeout(self.settings.auth_timeout, fut).await {
            Ok(res) => res,
            Err(_) => Err(AppError::timeout(
                format!("{what}_timeout"),
                format!("{what} did not answer within {:?}", self.settings.auth_timeout),
            )),
        }
    }
}
