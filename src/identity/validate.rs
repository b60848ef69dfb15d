//! Local form validation. Runs before any provider contact so malformed
//! input never leaves the process.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{AppError, AppResult};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,64}$").unwrap());
static MOBILE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{10}$").unwrap());

pub fn validate_email(email: &str) -> AppResult<()> {
    if email.is_empty() {
        return Err(AppError::validation("email_missing", "Please enter your email"));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(AppError::validation("email_invalid", "Please enter a valid email address"));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> AppResult<()> {
    if password.is_empty() {
        return Err(AppError::validation("password_missing", "Please enter your password"));
    }
    if password.chars().count() < 6 {
        return Err(AppError::validation("password_short", "Password must be at least 6 characters"));
    }
    Ok(())
}

/// Mobile numbers are exactly 10 digits, no separators.
pub fn validate_mobile(mobile: &str) -> AppResult<()> {
    if mobile.is_empty() {
        return Err(AppError::validation("mobile_missing", "Please enter your mobile number"));
    }
    if !MOBILE_RE.is_match(mobile) {
        return Err(AppError::validation("mobile_invalid", "Please enter a valid mobile number"));
    }
    Ok(())
}
