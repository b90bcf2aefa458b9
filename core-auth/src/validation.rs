//! Form validation run before any network call.

use crate::error::{AuthError, Result};
use crate::types::Role;
use regex::Regex;
use std::sync::OnceLock;

pub const MIN_REGISTRATION_PASSWORD_LEN: usize = 9;
pub const MIN_CHANGED_PASSWORD_LEN: usize = 6;

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

fn email_regex() -> Option<&'static Regex> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(EMAIL_PATTERN).ok()).as_ref()
}

pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_some_and(|re| re.is_match(email))
}

pub fn validate_email(email: &str) -> Result<()> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(AuthError::invalid("email", "Please enter a valid email address"))
    }
}

/// Both login fields must be filled.
pub fn validate_login(username: &str, password: &str) -> Result<()> {
    if username.trim().is_empty() {
        return Err(AuthError::invalid("username", "Please fill all fields"));
    }
    if password.is_empty() {
        return Err(AuthError::invalid("password", "Please fill all fields"));
    }
    Ok(())
}

/// Sign-up form as entered by the user.
#[derive(Clone)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub role: Role,
}

impl std::fmt::Debug for RegistrationForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationForm")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl RegistrationForm {
    /// Checks run in the order the sign-up screen reports them.
    pub fn validate(&self) -> Result<()> {
        if self.password != self.confirm_password {
            return Err(AuthError::invalid(
                "confirm_password",
                "Passwords do not match",
            ));
        }
        validate_registration(&self.username, &self.email, &self.password)
    }
}

/// Registration fields without the confirmation check.
pub fn validate_registration(username: &str, email: &str, password: &str) -> Result<()> {
    if password.chars().count() < MIN_REGISTRATION_PASSWORD_LEN {
        return Err(AuthError::invalid(
            "password",
            format!(
                "Password must be at least {} characters",
                MIN_REGISTRATION_PASSWORD_LEN
            ),
        ));
    }
    if username.trim().is_empty() || email.trim().is_empty() {
        let field = if username.trim().is_empty() {
            "username"
        } else {
            "email"
        };
        return Err(AuthError::invalid(field, "Please fill all fields"));
    }
    validate_email(email.trim())
}

/// Password change form checks.
pub fn validate_password_change(current: &str, new: &str, confirm: &str) -> Result<()> {
    if current.is_empty() {
        return Err(AuthError::invalid(
            "current_password",
            "Please enter your current password",
        ));
    }
    if new.is_empty() {
        return Err(AuthError::invalid("new_password", "Please enter a new password"));
    }
    if new.chars().count() < MIN_CHANGED_PASSWORD_LEN {
        return Err(AuthError::invalid(
            "new_password",
            format!(
                "Password must be at least {} characters long",
                MIN_CHANGED_PASSWORD_LEN
            ),
        ));
    }
    if new != confirm {
        return Err(AuthError::invalid(
            "confirm_password",
            "New passwords do not match",
        ));
    }
    Ok(())
}
