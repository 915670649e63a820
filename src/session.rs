//! Login state for one CLI invocation.
//!
//! The credential checks are placeholders carried over from the web client
//! (a fixed plaintext admin pair compared locally). They gate navigation
//! only and are not an authentication mechanism.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::info;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "password123";

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\S+@\S+\.\S+").expect("email pattern is valid")
});

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoginError {
    #[error("Please enter a valid email and a password.")]
    InvalidUserCredentials,
    #[error("Admin credentials required to proceed.")]
    InvalidAdminCredentials,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Session {
    pub user_logged_in: bool,
    pub admin_logged_in: bool,
}

impl Session {
    pub fn login_as_user(self) -> Self {
        Self {
            user_logged_in: true,
            ..self
        }
    }

    pub fn login_as_admin(self) -> Self {
        Self {
            admin_logged_in: true,
            ..self
        }
    }

    pub fn logout(self) -> Self {
        Self::default()
    }

    /// Form library and surveys.
    pub fn can_browse(&self) -> bool {
        self.user_logged_in || self.admin_logged_in
    }

    pub fn is_admin(&self) -> bool {
        self.admin_logged_in
    }

    /// Login form: the admin pair grants admin, any plausible email with a
    /// password grants user.
    pub fn sign_in(self, login: &str, password: &str) -> Result<Self, LoginError> {
        match check_login(login, password) {
            Some(Role::Admin) => {
                info!("signed in as admin");
                Ok(self.login_as_admin())
            }
            Some(Role::User) => {
                info!(login, "signed in as user");
                Ok(self.login_as_user())
            }
            None => Err(LoginError::InvalidUserCredentials),
        }
    }

    /// Admin gate: only the admin pair is accepted.
    pub fn admin_sign_in(self, username: &str, password: &str) -> Result<Self, LoginError> {
        if is_admin_credentials(username, password) {
            info!("admin gate passed");
            Ok(self.login_as_admin())
        } else {
            Err(LoginError::InvalidAdminCredentials)
        }
    }
}

pub fn check_login(login: &str, password: &str) -> Option<Role> {
    if is_admin_credentials(login, password) {
        return Some(Role::Admin);
    }
    if is_valid_email(login) && !password.is_empty() {
        return Some(Role::User);
    }
    None
}

pub fn is_admin_credentials(username: &str, password: &str) -> bool {
    username == ADMIN_USERNAME && password == ADMIN_PASSWORD
}

pub fn is_valid_email(input: &str) -> bool {
    EMAIL_PATTERN.is_match(input)
}
