//! Unified application error model shared by the session manager and the
//! heatmap filter engine. Every variant carries a stable machine code plus a
//! user-presentable message; nothing in this core is fatal to the process.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    /// Bad local input (email regex, password length, mobile format). Never
    /// reaches the identity provider.
    Validation { code: String, message: String },
    /// The identity provider rejected the request.
    Auth { code: String, message: String },
    /// The profile store rejected a read or write.
    ProfileStore { code: String, message: String },
    /// A provider or store call exceeded the configured deadline.
    Timeout { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::Validation { code, .. }
            | AppError::Auth { code, .. }
            | AppError::ProfileStore { code, .. }
            | AppError::Timeout { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::Validation { message, .. }
            | AppError::Auth { message, .. }
            | AppError::ProfileStore { message, .. }
            | AppError::Timeout { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn validation<S: Into<String>>(code: S, msg: S) -> Self { AppError::Validation { code: code.into(), message: msg.into() } }
    pub fn auth<S: Into<String>>(code: S, msg: S) -> Self { AppError::Auth { code: code.into(), message: msg.into() } }
    pub fn profile<S: Into<String>>(code: S, msg: S) -> Self { AppError::ProfileStore { code: code.into(), message: msg.into() } }
    pub fn timeout<S: Into<String>>(code: S, msg: S) -> Self { AppError::Timeout { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    pub fn is_validation(&self) -> bool { matches!(self, AppError::Validation { .. }) }
    pub fn is_timeout(&self) -> bool { matches!(self, AppError::Timeout { .. }) }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal { code: "internal_error".into(), message: err.to_string() }
    }
}
