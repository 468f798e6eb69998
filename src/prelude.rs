//! Convenience re-exports for common use.

pub use crate::auth::{SessionHook, SessionSnapshot, SessionState, Token, TokenStore};
pub use crate::client::{AuthenticatedClient, HttpResponse, RequestSpec};
pub use crate::config::{ClientConfig, CredentialMode};
pub use crate::error::{BidlinkError, Result};
pub use crate::refresh::{RefreshCoordinator, Refresher};
