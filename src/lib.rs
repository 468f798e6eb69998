//! bidlink: client SDK for the bidlink freelance marketplace API.
//!
//! The heart of the crate is [`client::AuthenticatedClient`]: every request
//! carries the session credentials, and when the API answers 401 the client
//! renews the session through a single-flight [`refresh::RefreshCoordinator`]
//! and replays the request once. However many requests fail together, only
//! one refresh call is made. If it fails, every waiting request gets the
//! refresh error and the [`auth::SessionHook`] runs once.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use bidlink::prelude::*;
//!
//! # async fn example() -> bidlink::error::Result<()> {
//! let session = SessionState::new();
//! let client = AuthenticatedClient::builder(ClientConfig::load()?, Arc::new(session.clone()))
//!     .build()?;
//!
//! client.auth(&session).login("ada@example.com", "hunter2").await?;
//! let gigs: serde_json::Value = client.get_data("gigs").await?;
//! println!("{gigs}");
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod prelude;
pub mod refresh;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
