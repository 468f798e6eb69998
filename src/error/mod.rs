//! Error types for bidlink.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use std::sync::Arc;

use thiserror::Error;

use crate::auth::AuthError;

/// Primary error type for all bidlink operations.
#[derive(Error, Debug)]
pub enum BidlinkError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// 401 on a request that is not allowed to trigger a session refresh.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// 401 on a request that was already replayed once after a refresh.
    #[error("Unauthorized after session refresh: {message}")]
    UnauthorizedAfterRetry { message: String },

    /// The refresh call failed. Shared by every request queued behind it.
    #[error("Session refresh failed: {0}")]
    RefreshFailed(#[source] Arc<BidlinkError>),

    #[error("Session refresh was cancelled")]
    Cancelled,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),
}

impl BidlinkError {
    /// Create an API error from a status and message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// The refresh error behind a `RefreshFailed`, if this is one.
    pub fn refresh_cause(&self) -> Option<&BidlinkError> {
        match self {
            Self::RefreshFailed(inner) => Some(inner.as_ref()),
            _ => None,
        }
    }

    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Unauthorized { .. } | Self::UnauthorizedAfterRetry { .. } => Some(401),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Unauthorized { .. } | Self::UnauthorizedAfterRetry { .. } => {
                ErrorCategory::Authentication
            }
            Self::Auth(AuthError::NotLoggedIn) => ErrorCategory::Authentication,
            Self::RefreshFailed(_) => ErrorCategory::SessionExpired,
            Self::Cancelled => ErrorCategory::Cancelled,
            Self::Network(_) | Self::Io(_) => ErrorCategory::Network,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Configuration(_) | Self::InvalidArgument(_) => ErrorCategory::Configuration,
            Self::Serialization(_) | Self::InvalidResponse(_) => ErrorCategory::Serialization,
            Self::Api { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                429 => ErrorCategory::RateLimit,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Api,
            },
            Self::Auth(_) => ErrorCategory::Unknown,
        }
    }

    /// Whether a caller could reasonably retry the operation.
    ///
    /// The client itself never retries on this basis.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::RateLimit
                | ErrorCategory::Network
                | ErrorCategory::Timeout
                | ErrorCategory::Server
        )
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self.category() {
            ErrorCategory::Authentication | ErrorCategory::SessionExpired => {
                RecoverySuggestion::Reauthenticate
            }
            ErrorCategory::RateLimit | ErrorCategory::Network | ErrorCategory::Server => {
                RecoverySuggestion::RetryWithBackoff
            }
            ErrorCategory::Timeout => RecoverySuggestion::IncreaseTimeout,
            ErrorCategory::Configuration => RecoverySuggestion::CheckConfiguration,
            ErrorCategory::Cancelled => RecoverySuggestion::RetryRequest,
            _ => RecoverySuggestion::ContactSupport,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, BidlinkError>;
