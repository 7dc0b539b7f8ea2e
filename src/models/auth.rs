//! Auth request/response payloads.
//!
//! Request types carry `validator` rules so forms get field errors before any
//! network call is made.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Token pair issued by login, registration, OAuth and refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    #[serde(alias = "token", alias = "accessToken")]
    pub access_token: String,
    #[serde(default, alias = "refreshToken")]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type", alias = "tokenType")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            token_type: default_token_type(),
        }
    }
}

/// Login form.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct LoginCredentials {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

impl LoginCredentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Registration form. `confirm_password` is checked locally and never sent.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct RegisterCredentials {
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username must be between 3 and 50 characters"
    ))]
    pub username: String,

    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    #[serde(skip_serializing)]
    #[validate(must_match(other = "password", message = "Passwords don't match"))]
    pub confirm_password: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

impl RegisterCredentials {
    /// Credentials for the login that follows a token-less registration.
    pub fn login_credentials(&self) -> LoginCredentials {
        LoginCredentials::new(self.email.clone(), self.password.clone())
    }
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Reset token is required"))]
    pub token: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,

    #[serde(skip_serializing)]
    #[validate(must_match(other = "password", message = "Passwords don't match"))]
    pub confirm_password: String,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub new_password: String,

    #[serde(skip_serializing)]
    #[validate(must_match(other = "new_password", message = "Passwords don't match"))]
    pub confirm_password: String,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct VerifyEmailRequest {
    #[validate(length(min = 1, message = "Verification token is required"))]
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Validate)]
pub struct ResendVerificationRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
}

/// OAuth provider advertised by `/auth/providers`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthProvider {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}
