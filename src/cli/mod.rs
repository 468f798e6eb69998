//! CLI entry point for bidlink.

pub mod auth;
pub mod request;

use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use crate::auth::{FileTokenStore, SessionState, TokenStore};
use crate::client::AuthenticatedClient;
use crate::config::{ClientConfig, CredentialMode};
use crate::error::BidlinkError;

/// bidlink marketplace CLI
#[derive(Parser, Debug)]
#[command(name = "bidlink", version, about = "bidlink marketplace API CLI")]
pub struct Cli {
    /// API base URL (overrides BIDLINK_BASE_URL and config.toml)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Stored session profile
    #[arg(long, global = true)]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Session management
    Auth(AuthArgs),
    /// Send an authenticated request and print the response body
    Request(RequestArgs),
}

/// Arguments for the `auth` subcommand group.
#[derive(Args, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommands,
}

/// Auth subcommands for login, status, and logout.
#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Log in with email and password
    Login(LoginArgs),
    /// Show the stored session and the current user
    Status,
    /// Log out and forget the stored session
    Logout,
}

/// Arguments for `bidlink auth login`.
#[derive(Args, Debug)]
pub struct LoginArgs {
    pub email: String,

    #[arg(long, env = "BIDLINK_PASSWORD", hide_env_values = true)]
    pub password: String,
}

/// Arguments for `bidlink request`.
#[derive(Args, Debug)]
pub struct RequestArgs {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE)
    pub method: String,

    /// Path relative to the base URL, e.g. `projects/42/bids`
    pub path: String,

    /// JSON request body
    #[arg(short, long)]
    pub data: Option<String>,
}

/// Everything a command needs: the client, its session and the token store.
pub struct CliContext {
    pub client: AuthenticatedClient,
    pub session: SessionState,
    pub store: Arc<dyn TokenStore>,
}

impl CliContext {
    /// The CLI keeps bearer tokens on disk so a login outlives the process.
    pub fn from_cli(cli: &Cli) -> Result<Self, BidlinkError> {
        let mut config = ClientConfig::load()?.with_credentials(CredentialMode::Bearer);
        if let Some(base_url) = &cli.base_url {
            config = config.with_base_url(base_url.clone());
        }
        if let Some(profile) = &cli.profile {
            config = config.with_profile(profile.clone());
        }
        let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new_default());
        let session = SessionState::new().with_token_store(store.clone(), config.profile.clone());
        let client = AuthenticatedClient::builder(config, Arc::new(session.clone()))
            .token_store(store.clone())
            .build()?;
        Ok(Self {
            client,
            session,
            store,
        })
    }
}
