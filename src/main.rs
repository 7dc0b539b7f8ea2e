// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Vocab-Session command line client
//!
//! Signs in to the vocabulary-trainer backend, keeps the tokens in a local
//! file and calls the API with them. Results go to stdout as JSON; logs go
//! to stderr.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vocab_session::{
    config::Config,
    models::{ForgotPasswordRequest, LoginCredentials, RegisterCredentials, Session},
    routes::TracingNavigator,
    storage::FileStorage,
    AuthContext,
};

#[derive(Debug, Parser)]
#[command(name = "vocab-session", version, about)]
struct Cli {
    /// Backend API base URL
    #[arg(long, env = "API_URL", global = true)]
    api_url: Option<String>,

    /// Token store file
    #[arg(long, env = "TOKEN_STORE_PATH", global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "VOCAB_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "VOCAB_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        full_name: Option<String>,
    },
    /// Sign out and forget the stored tokens
    Logout,
    /// Show the current session
    Whoami,
    /// Exchange the refresh token for a new pair
    Refresh,
    /// Request a password reset email
    ForgotPassword {
        #[arg(long)]
        email: String,
    },
    /// List the OAuth providers offered by the backend
    Providers,
    /// GET an API path with the stored credentials
    Get { path: String },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionOutput {
    #[serde(flatten)]
    session: vocab_session::models::PersistedSession,
    is_admin: bool,
}

impl From<&Session> for SessionOutput {
    fn from(session: &Session) -> Self {
        Self {
            session: session.to_persisted(),
            is_admin: session.is_admin(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    let cli = Cli::parse();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(url) = &cli.api_url {
        config = config
            .with_api_base_url(url)
            .context("Invalid --api-url")?;
    }
    if let Some(path) = cli.store {
        config.token_store_path = path;
    }

    let storage = FileStorage::open(&config.token_store_path).with_context(|| {
        format!(
            "Failed to open token store {}",
            config.token_store_path.display()
        )
    })?;
    tracing::debug!(
        api = %config.api_base_url,
        store = %config.token_store_path.display(),
        "Starting {}",
        config.app_name
    );

    let ctx = AuthContext::new(config, Arc::new(storage), Arc::new(TracingNavigator))?;
    ctx.session.hydrate();
    ctx.session.initialize_auth().await;

    match cli.command {
        Command::Login { email, password } => {
            let session = ctx
                .session
                .login(&LoginCredentials::new(email, password))
                .await?;
            print_json(&SessionOutput::from(&session))?;
        }
        Command::Register {
            username,
            email,
            password,
            full_name,
        } => {
            let credentials = RegisterCredentials {
                username,
                email,
                confirm_password: password.clone(),
                password,
                full_name,
            };
            let session = ctx.session.register(&credentials).await?;
            print_json(&SessionOutput::from(&session))?;
        }
        Command::Logout => {
            ctx.session.logout().await;
            print_json(&SessionOutput::from(&ctx.session.snapshot()))?;
        }
        Command::Whoami => {
            print_json(&SessionOutput::from(&ctx.session.snapshot()))?;
        }
        Command::Refresh => {
            let session = ctx.session.refresh_token().await?;
            print_json(&SessionOutput::from(&session))?;
        }
        Command::ForgotPassword { email } => {
            ctx.auth
                .forgot_password(&ForgotPasswordRequest { email })
                .await?;
            print_json(&serde_json::json!({ "success": true }))?;
        }
        Command::Providers => {
            let providers = ctx.auth.oauth_providers().await?;
            print_json(&providers)?;
        }
        Command::Get { path } => {
            let response = ctx.api.get::<serde_json::Value>(&path).await?;
            print_json(&response)?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Initialize structured JSON logging on stderr.
fn init_logging() -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vocab_session=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
