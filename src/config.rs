//! Environment-driven settings. All knobs use the DRISHTI_ prefix and fall
//! back to defaults suitable for development.

use std::time::Duration;

use crate::identity::UserRole;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Deadline applied to every identity-provider and profile-store call.
    pub auth_timeout: Duration,
    /// Role assigned when a provider account has no stored profile.
    pub default_role: UserRole,
}

impl Default for Settings {
    fn default() -> Self {
        Self { auth_timeout: Duration::from_secs(30), default_role: UserRole::Researcher }
    }
}

impl Settings {
    /// Read DRISHTI_AUTH_TIMEOUT_SECS and DRISHTI_DEFAULT_ROLE, keeping the
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let mut s = Settings::default();
        if let Ok(v) = std::env::var("DRISHTI_AUTH_TIMEOUT_SECS") {
            if let Ok(secs) = v.trim().parse::<u64>() {
                if secs > 0 { s.auth_timeout = Duration::from_secs(secs); }
            }
        }
        if let Ok(v) = std::env::var("DRISHTI_DEFAULT_ROLE") {
            if let Some(role) = UserRole::parse(&v) { s.default_role = role; }
        }
        s
    }
}
