//! Session manager integration tests against scripted provider/store fakes.
//! These pin the state machine contract: validation short-circuits before any
//! provider contact, provider calls happen exactly once per attempt, the
//! observer reconciles missing profiles, and timeouts surface distinctly.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::{broadcast, Notify};

use drishti_core::config::Settings;
use drishti_core::error::{AppError, AppResult};
use drishti_core::identity::{
    AuthPhase, IdentityProvider, ProfileStore, SessionEvent, SessionManager, UserHandle,
    UserProfile, UserRole,
};

#[derive(Default)]
struct Counters {
    sign_in: AtomicUsize,
    create: AtomicUsize,
    sign_out: AtomicUsize,
    oauth: AtomicUsize,
}

struct ScriptedProvider {
    counters: Counters,
    fail_sign_out: bool,
    hang_sign_in: bool,
    /// When set, sign_in blocks until the gate is notified.
    gate: Option<Arc<Notify>>,
    events: broadcast::Sender<SessionEvent>,
}

impl ScriptedProvider {
    fn new() -> Self {
        let (events, _) = broadcast::channel(8);
        Self {
            counters: Counters::default(),
            fail_sign_out: false,
            hang_sign_in: false,
            gate: None,
            events,
        }
    }

    fn handle() -> UserHandle {
        UserHandle {
            id: "user-1".into(),
            email: "alice@example.org".into(),
            email_verified: true,
        }
    }

    fn push_session(&self, user: Option<UserHandle>) {
        let _ = self.events.send(SessionEvent { user });
    }
}

#[async_trait]
impl IdentityProvider for ScriptedProvider {
    async fn create_account(&self, email: &str, _password: &str) -> AppResult<UserHandle> {
        self.counters.create.fetch_add(1, Ordering::SeqCst);
        Ok(UserHandle { id: "user-1".into(), email: email.to_string(), email_verified: false })
    }

    async fn sign_in(&self, email: &str, _password: &str) -> AppResult<UserHandle> {
        self.counters.sign_in.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.hang_sign_in {
            std::future::pending::<()>().await;
        }
        Ok(UserHandle { id: "user-1".into(), email: email.to_string(), email_verified: true })
    }

    async fn sign_out(&self) -> AppResult<()> {
        self.counters.sign_out.fetch_add(1, Ordering::SeqCst);
        if self.fail_sign_out {
            return Err(AppError::auth("network", "provider unreachable"));
        }
        Ok(())
    }

    async fn send_password_reset(&self, _email: &str) -> AppResult<()> {
        Ok(())
    }

    async fn sign_in_with_oauth(&self, _provider_tag: &str) -> AppResult<UserHandle> {
        self.counters.oauth.fetch_add(1, Ordering::SeqCst);
        Ok(Self::handle())
    }

    fn session_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

#[derive(Default)]
struct RecordingStore {
    profiles: RwLock<HashMap<String, UserProfile>>,
    saves: AtomicUsize,
    fail_save: bool,
}

impl RecordingStore {
    fn seed(&self, profile: UserProfile) {
        self.profiles.write().insert(profile.id.clone(), profile);
    }
}

#[async_trait]
impl ProfileStore for RecordingStore {
    async fn save_profile(&self, profile: &UserProfile) -> AppResult<()> {
        if self.fail_save {
            return Err(AppError::profile("store_down", "profile store unavailable"));
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.profiles.write().insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    async fn fetch_profile(&self, id: &str) -> AppResult<Option<UserProfile>> {
        Ok(self.profiles.read().get(id).cloned())
    }
}

fn manager_with(
    provider: Arc<ScriptedProvider>,
    store: Arc<RecordingStore>,
) -> Arc<SessionManager> {
    Arc::new(SessionManager::new(provider, store, Settings::default()))
}

async fn wait_for_phase(sm: &SessionManager, phase: AuthPhase) {
    let mut rx = sm.subscribe();
    tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            if rx.borrow_and_update().phase == phase {
                break;
            }
            rx.changed().await.expect("state channel closed");
        }
    })
    .await
    .expect("state never reached expected phase");
}

#[tokio::test]
async fn valid_sign_in_calls_provider_exactly_once() {
    let provider = Arc::new(ScriptedProvider::new());
    let store = Arc::new(RecordingStore::default());
    let sm = manager_with(provider.clone(), store);

    let user = sm.sign_in("alice@example.org", "s3cr3t!").await.unwrap();
    assert_eq!(provider.counters.sign_in.load(Ordering::SeqCst), 1);
    assert_eq!(user.email, "alice@example.org");
    assert!(sm.state().is_authenticated());
}

#[tokio::test]
async fn malformed_email_never_reaches_provider() {
    let provider = Arc::new(ScriptedProvider::new());
    let store = Arc::new(RecordingStore::default());
    let sm = manager_with(provider.clone(), store);

    for bad in ["", "plainaddress", "missing@tld"] {
        let err = sm.sign_in(bad, "s3cr3t!").await.unwrap_err();
        assert!(err.is_validation(), "{bad} should fail locally");
    }
    let err = sm.sign_in("alice@example.org", "12345").await.unwrap_err();
    assert!(err.is_validation());

    assert_eq!(provider.counters.sign_in.load(Ordering::SeqCst), 0);
    assert_eq!(sm.state().phase, AuthPhase::Unauthenticated);
}

#[tokio::test]
async fn short_mobile_writes_no_account_and_no_profile() {
    let provider = Arc::new(ScriptedProvider::new());
    let store = Arc::new(RecordingStore::default());
    let sm = manager_with(provider.clone(), store.clone());

    let err = sm
        .sign_up("alice@example.org", "s3cr3t!", "12345", UserRole::Researcher)
        .await
        .unwrap_err();
    assert_eq!(err.code_str(), "mobile_invalid");
    assert_eq!(provider.counters.create.load(Ordering::SeqCst), 0);
    assert_eq!(store.saves.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn sign_up_persists_role_tagged_profile() {
    let provider = Arc::new(ScriptedProvider::new());
    let store = Arc::new(RecordingStore::default());
    let sm = manager_with(provider.clone(), store.clone());

    let user = sm
        .sign_up("alice@example.org", "s3cr3t!", "9876543210", UserRole::Government)
        .await
        .unwrap();
    assert_eq!(user.role, UserRole::Government);
    assert_eq!(provider.counters.create.load(Ordering::SeqCst), 1);

    let saved = store.profiles.read().get("user-1").cloned().unwrap();
    assert_eq!(saved.role, "government");
    assert_eq!(saved.mobile_number.as_deref(), Some("9876543210"));
    assert!(sm.state().is_authenticated());
}

#[tokio::test]
async fn observer_defaults_missing_profile_to_researcher() {
    let provider = Arc::new(ScriptedProvider::new());
    let store = Arc::new(RecordingStore::default());
    let sm = manager_with(provider.clone(), store);

    {
        let sm = sm.clone();
        tokio::spawn(async move { sm.run_observer().await });
    }
    // Let the observer task subscribe before the first event fires.
    tokio::task::yield_now().await;

    provider.push_session(Some(ScriptedProvider::handle()));
    wait_for_phase(&sm, AuthPhase::Authenticated).await;
    let user = sm.state().user.unwrap();
    assert_eq!(user.role, UserRole::Researcher);
    assert_eq!(user.id, "user-1");

    // An empty session event resets everything.
    provider.push_session(None);
    wait_for_phase(&sm, AuthPhase::Unauthenticated).await;
    assert!(sm.state().user.is_none());
}

#[tokio::test]
async fn observer_prefers_stored_profile_role() {
    let provider = Arc::new(ScriptedProvider::new());
    let store = Arc::new(RecordingStore::default());
    store.seed(UserProfile {
        id: "user-1".into(),
        email: "alice@example.org".into(),
        mobile_number: Some("9876543210".into()),
        role: "admin".into(),
        created_at: chrono::Utc::now(),
    });
    let sm = manager_with(provider.clone(), store);

    {
        let sm = sm.clone();
        tokio::spawn(async move { sm.run_observer().await });
    }
    tokio::task::yield_now().await;

    provider.push_session(Some(ScriptedProvider::handle()));
    wait_for_phase(&sm, AuthPhase::Authenticated).await;
    assert_eq!(sm.state().user.unwrap().role, UserRole::Admin);
}

#[tokio::test]
async fn sign_out_clears_state_even_when_provider_fails() {
    let mut provider = ScriptedProvider::new();
    provider.fail_sign_out = true;
    let provider = Arc::new(provider);
    let store = Arc::new(RecordingStore::default());
    let sm = manager_with(provider.clone(), store);

    sm.sign_in("alice@example.org", "s3cr3t!").await.unwrap();
    assert!(sm.state().is_authenticated());

    let err = sm.sign_out().await.unwrap_err();
    assert_eq!(err.code_str(), "network");

    let state = sm.state();
    assert_eq!(state.phase, AuthPhase::Unauthenticated);
    assert!(state.user.is_none());
    assert_eq!(state.error.as_deref(), Some("provider unreachable"));
}

#[tokio::test]
async fn second_attempt_rejected_while_authenticating() {
    let gate = Arc::new(Notify::new());
    let mut provider = ScriptedProvider::new();
    provider.gate = Some(gate.clone());
    let provider = Arc::new(provider);
    let store = Arc::new(RecordingStore::default());
    let sm = manager_with(provider.clone(), store);

    let first = {
        let sm = sm.clone();
        tokio::spawn(async move { sm.sign_in("alice@example.org", "s3cr3t!").await })
    };
    // Wait until the first attempt is inside the provider call.
    while provider.counters.sign_in.load(Ordering::SeqCst) == 0 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    let err = sm.sign_in("alice@example.org", "s3cr3t!").await.unwrap_err();
    assert_eq!(err.code_str(), "auth_in_progress");

    gate.notify_one();
    first.await.unwrap().unwrap();
    assert!(sm.state().is_authenticated());
    assert_eq!(provider.counters.sign_in.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn hanging_provider_surfaces_timeout() {
    let mut provider = ScriptedProvider::new();
    provider.hang_sign_in = true;
    let provider = Arc::new(provider);
    let store = Arc::new(RecordingStore::default());
    let settings = Settings {
        auth_timeout: Duration::from_millis(50),
        default_role: UserRole::Researcher,
    };
    let sm = SessionManager::new(provider, store, settings);

    let err = sm.sign_in("alice@example.org", "s3cr3t!").await.unwrap_err();
    assert!(err.is_timeout());
    let state = sm.state();
    assert_eq!(state.phase, AuthPhase::Unauthenticated);
    assert!(state.error.is_some());
}

#[tokio::test]
async fn google_sign_in_lazily_provisions_default_profile() {
    let provider = Arc::new(ScriptedProvider::new());
    let store = Arc::new(RecordingStore::default());
    let sm = manager_with(provider.clone(), store.clone());

    let user = sm.sign_in_with_google().await.unwrap();
    assert_eq!(user.role, UserRole::Researcher);
    assert_eq!(provider.counters.oauth.load(Ordering::SeqCst), 1);
    assert_eq!(store.profiles.read().get("user-1").unwrap().role, "researcher");

    // A later OAuth login picks up whatever role the profile holds now.
    store.profiles.write().get_mut("user-1").unwrap().role = "admin".into();
    let user = sm.sign_in_with_google().await.unwrap();
    assert_eq!(user.role, UserRole::Admin);
    assert_eq!(store.saves.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn profile_save_failure_is_reconciled_by_observer() {
    let store = Arc::new(RecordingStore { fail_save: true, ..Default::default() });
    let provider = Arc::new(ScriptedProvider::new());
    let sm = manager_with(provider.clone(), store);

    let err = sm
        .sign_up("alice@example.org", "s3cr3t!", "9876543210", UserRole::Government)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ProfileStore { .. }));
    assert_eq!(sm.state().phase, AuthPhase::Unauthenticated);

    // The provider account exists; the next session event reconciles with the
    // default role instead of the lost profile.
    {
        let sm = sm.clone();
        tokio::spawn(async move { sm.run_observer().await });
    }
    tokio::task::yield_now().await;
    provider.push_session(Some(ScriptedProvider::handle()));
    wait_for_phase(&sm, AuthPhase::Authenticated).await;
    assert_eq!(sm.state().user.unwrap().role, UserRole::Researcher);
}
