//! Client-side session state and the deauthentication hook.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;

use super::store::TokenStore;
use crate::error::BidlinkError;

/// Collaborator invoked once when a session refresh fails.
///
/// Implemented for plain closures, so tests and embedders can pass
/// `Arc::new(|err: &BidlinkError| ...)`.
pub trait SessionHook: Send + Sync {
    fn deauthenticate(&self, reason: &BidlinkError);
}

impl<F> SessionHook for F
where
    F: Fn(&BidlinkError) + Send + Sync,
{
    fn deauthenticate(&self, reason: &BidlinkError) {
        self(reason)
    }
}

/// Point-in-time view of the session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub user: Option<Value>,
    pub is_authenticated: bool,
    /// Set when the session ended because a refresh failed, not by logout.
    pub expired: bool,
}

/// Shared session state, observable through a watch channel.
///
/// # Example
/// ```
/// use bidlink::auth::SessionState;
///
/// let session = SessionState::new();
/// let mut updates = session.subscribe();
/// session.authenticate(serde_json::json!({ "name": "Ada" }));
/// assert!(updates.borrow_and_update().is_authenticated);
/// ```
#[derive(Clone)]
pub struct SessionState {
    tx: Arc<watch::Sender<SessionSnapshot>>,
    store: Option<(Arc<dyn TokenStore>, String)>,
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("snapshot", &*self.tx.borrow())
            .field("store", &self.store.as_ref().map(|(_, profile)| profile))
            .finish()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionState {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionSnapshot::default());
        Self {
            tx: Arc::new(tx),
            store: None,
        }
    }

    /// Clear persisted credentials for `profile` whenever the session ends.
    pub fn with_token_store(mut self, store: Arc<dyn TokenStore>, profile: impl Into<String>) -> Self {
        self.store = Some((store, profile.into()));
        self
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.tx.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.tx.borrow().is_authenticated
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.tx.subscribe()
    }

    pub fn authenticate(&self, user: Value) {
        self.tx.send_replace(SessionSnapshot {
            user: Some(user),
            is_authenticated: true,
            expired: false,
        });
    }

    /// End the session after an explicit logout.
    pub fn clear(&self) {
        self.end(false);
    }

    fn end(&self, expired: bool) {
        if let Some((store, profile)) = &self.store {
            if let Err(error) = store.clear(profile) {
                tracing::warn!(%error, profile = %profile, "failed to clear stored session");
            }
        }
        self.tx.send_replace(SessionSnapshot {
            user: None,
            is_authenticated: false,
            expired,
        });
    }
}

impl SessionHook for SessionState {
    fn deauthenticate(&self, reason: &BidlinkError) {
        tracing::info!(%reason, "session expired");
        self.end(true);
    }
}
