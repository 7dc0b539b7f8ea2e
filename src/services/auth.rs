// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Backend auth endpoints.
//!
//! Every call that receives tokens writes them through the token store
//! before returning, so the next request already carries them.

use serde_json::{json, Value};
use std::sync::Arc;
use validator::Validate;

use crate::error::{ClientError, Result};
use crate::models::{
    ApiResponse, ChangePasswordRequest, ForgotPasswordRequest, LoginCredentials, OAuthProvider,
    RegisterCredentials, ResendVerificationRequest, ResetPasswordRequest, TokenPair, User,
    VerifyEmailRequest,
};
use crate::services::api_client::ApiClient;

pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const LOGOUT_PATH: &str = "/auth/logout";
pub const CURRENT_USER_PATH: &str = "/users/me";
pub const FORGOT_PASSWORD_PATH: &str = "/auth/forgot-password";
pub const RESET_PASSWORD_PATH: &str = "/auth/reset-password";
pub const CHANGE_PASSWORD_PATH: &str = "/auth/change-password";
pub const VERIFY_EMAIL_PATH: &str = "/auth/verify-email";
pub const RESEND_VERIFICATION_PATH: &str = "/auth/resend-verification";
pub const PROVIDERS_PATH: &str = "/auth/providers";

/// Stateless wrapper over the API client.
#[derive(Debug, Clone)]
pub struct AuthService {
    api: Arc<ApiClient>,
}

impl AuthService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    pub async fn login(&self, credentials: &LoginCredentials) -> Result<TokenPair> {
        credentials.validate()?;

        let response: ApiResponse<TokenPair> =
            self.api.post_public(LOGIN_PATH, credentials).await?;
        let pair = response.into_data()?;

        self.store(&pair);
        tracing::info!(email = %credentials.email, "Logged in");
        Ok(pair)
    }

    /// Register, then log in with the same credentials if the backend did
    /// not hand out tokens itself.
    pub async fn register(&self, credentials: &RegisterCredentials) -> Result<TokenPair> {
        credentials.validate()?;

        let response: ApiResponse<Value> =
            self.api.post_public(REGISTER_PATH, credentials).await?;
        let data = match response.into_data() {
            Ok(data) => Some(data),
            Err(ClientError::MissingData) => None,
            Err(e) => return Err(e),
        };

        match data.and_then(|data| serde_json::from_value::<TokenPair>(data).ok()) {
            Some(pair) => {
                self.store(&pair);
                tracing::info!(email = %credentials.email, "Registered");
                Ok(pair)
            }
            None => {
                tracing::info!(
                    email = %credentials.email,
                    "Registration returned no tokens, logging in"
                );
                self.login(&credentials.login_credentials()).await
            }
        }
    }

    /// Tell the backend the session is over. Failures are logged and ignored.
    pub async fn logout(&self) {
        if let Err(e) = self.api.post_empty::<Value>(LOGOUT_PATH).await {
            tracing::warn!(error = %e, "Backend logout failed, continuing with local logout");
        }
    }

    pub async fn get_current_user(&self) -> Result<User> {
        if !self.api.tokens().is_authenticated() {
            return Err(ClientError::NoToken);
        }

        let response: ApiResponse<User> = self.api.get(CURRENT_USER_PATH).await?;
        response.into_data()
    }

    /// Exchange the refresh token, sharing any exchange already in flight.
    pub async fn refresh(&self) -> Result<TokenPair> {
        self.api.refresh_tokens().await
    }

    pub async fn forgot_password(&self, request: &ForgotPasswordRequest) -> Result<()> {
        request.validate()?;
        self.api
            .post_public::<Value, _>(FORGOT_PASSWORD_PATH, request)
            .await?
            .into_unit()
    }

    pub async fn reset_password(&self, request: &ResetPasswordRequest) -> Result<()> {
        request.validate()?;
        self.api
            .post_public::<Value, _>(RESET_PASSWORD_PATH, request)
            .await?
            .into_unit()
    }

    /// Requires a signed-in user.
    pub async fn change_password(&self, request: &ChangePasswordRequest) -> Result<()> {
        request.validate()?;
        self.api
            .post::<Value, _>(CHANGE_PASSWORD_PATH, request)
            .await?
            .into_unit()
    }

    pub async fn verify_email(&self, request: &VerifyEmailRequest) -> Result<()> {
        request.validate()?;
        self.api
            .post_public::<Value, _>(VERIFY_EMAIL_PATH, request)
            .await?
            .into_unit()
    }

    pub async fn resend_verification(&self, request: &ResendVerificationRequest) -> Result<()> {
        request.validate()?;
        self.api
            .post_public::<Value, _>(RESEND_VERIFICATION_PATH, request)
            .await?
            .into_unit()
    }

    pub async fn oauth_providers(&self) -> Result<Vec<OAuthProvider>> {
        let response: ApiResponse<Vec<OAuthProvider>> =
            self.api.get_public(PROVIDERS_PATH).await?;
        response.into_data()
    }

    /// Complete an OAuth sign-in with the provider's authorization code.
    pub async fn oauth_callback(&self, provider: &str, code: &str) -> Result<TokenPair> {
        if provider.trim().is_empty() || code.trim().is_empty() {
            return Err(ClientError::Validation(
                "OAuth provider and code are required".to_string(),
            ));
        }

        let path = oauth_callback_path(provider);
        let response: ApiResponse<TokenPair> = self
            .api
            .post_public(&path, &json!({ "code": code }))
            .await?;
        let pair = response.into_data()?;

        self.store(&pair);
        tracing::info!(provider, "Signed in with OAuth provider");
        Ok(pair)
    }

    /// Every caller starts a new session, so a missing refresh token drops
    /// the stored one.
    fn store(&self, pair: &TokenPair) {
        self.api
            .tokens()
            .replace_tokens(&pair.access_token, pair.refresh_token.as_deref());
    }
}

fn oauth_callback_path(provider: &str) -> String {
    format!("/auth/oauth/{}/callback", urlencoding::encode(provider))
}
