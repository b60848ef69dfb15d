//! Identity, session state, and role authorization for the monitoring core.
//! Keep the public surface thin and split implementation across sub-modules.

mod authorizer;
mod local;
mod provider;
mod session;
mod user;
mod validate;

pub use authorizer::{check_access, dashboard_for, Capability, Dashboard};
pub use local::{InMemoryProfileStore, LocalIdentityProvider};
pub use provider::{IdentityProvider, ProfileStore, SessionEvent, UserHandle, UserProfile};
pub use session::{AuthPhase, FormState, SessionManager, SessionState};
pub use user::{User, UserRole};
pub use validate::{validate_email, validate_mobile, validate_password};
