//! Coarse role-based gates for the dashboard tier. Admin passes every gate;
//! everything else is deny-by-default.

use super::user::UserRole;

/// Dashboard variant shown after login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dashboard {
    Admin,
    Government,
    Researcher,
}

pub fn dashboard_for(role: UserRole) -> Dashboard {
    match role {
        UserRole::Admin => Dashboard::Admin,
        UserRole::Government => Dashboard::Government,
        UserRole::Researcher => Dashboard::Researcher,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    ViewHeatmap,
    ExportSamples,
    FilePolicyReport,
    ManageUsers,
}

pub fn check_access(role: UserRole, cap: Capability) -> bool {
    if role == UserRole::Admin {
        return true;
    }
    match cap {
        Capability::ViewHeatmap => true,
        Capability::ExportSamples => role == UserRole::Researcher,
        Capability::FilePolicyReport => role == UserRole::Government,
        Capability::ManageUsers => false,
    }
}
