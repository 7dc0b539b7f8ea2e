// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models shared by the client, services and guards.

pub mod auth;
pub mod envelope;
pub mod session;
pub mod user;

pub use auth::{
    ChangePasswordRequest, ForgotPasswordRequest, LoginCredentials, OAuthProvider,
    RegisterCredentials, ResendVerificationRequest, ResetPasswordRequest, TokenPair,
    VerifyEmailRequest,
};
pub use envelope::ApiResponse;
pub use session::{PersistedSession, Session};
pub use user::{Role, User};
