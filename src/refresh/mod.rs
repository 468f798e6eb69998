//! Single-flight session refresh.
//!
//! [`RefreshCoordinator`] makes sure that however many requests hit a 401 at
//! once, exactly one refresh call runs. The first caller leads the refresh.
//! Everyone who arrives while it runs queues behind it and shares its outcome.
//!
//! ```text
//!   Idle ──await_refresh()──▶ Refreshing { waiters } ──settle──▶ Idle
//!                                   ▲        │
//!                                   └────────┘ await_refresh() enqueues
//! ```

mod endpoint;

pub use endpoint::EndpointRefresher;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::auth::SessionHook;
use crate::error::BidlinkError;
use crate::util::timeout::with_timeout;

/// Exchanges an expired credential for a renewed one.
#[async_trait]
pub trait Refresher: Send + Sync {
    async fn refresh(&self) -> Result<(), BidlinkError>;
}

type RefreshOutcome = Result<(), Arc<BidlinkError>>;
type Waiter = oneshot::Sender<RefreshOutcome>;

enum RefreshState {
    Idle,
    Refreshing { waiters: VecDeque<Waiter> },
}

enum Role {
    Leader,
    Waiter(oneshot::Receiver<RefreshOutcome>),
}

/// Coordinates one refresh per window of concurrent auth failures.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use bidlink::error::BidlinkError;
/// use bidlink::refresh::{RefreshCoordinator, Refresher};
///
/// struct Noop;
///
/// #[async_trait]
/// impl Refresher for Noop {
///     async fn refresh(&self) -> Result<(), BidlinkError> {
///         Ok(())
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), BidlinkError> {
/// let coordinator = RefreshCoordinator::new(
///     Arc::new(Noop),
///     Arc::new(|_: &BidlinkError| {}),
/// );
/// coordinator.await_refresh().await?;
/// assert_eq!(coordinator.refresh_count(), 1);
/// # Ok(())
/// # }
/// ```
pub struct RefreshCoordinator {
    refresher: Arc<dyn Refresher>,
    hook: Arc<dyn SessionHook>,
    timeout: Option<Duration>,
    state: Mutex<RefreshState>,
    refreshes: AtomicU64,
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("refreshing", &self.is_refreshing())
            .field("waiters", &self.pending_waiters())
            .field("refreshes", &self.refresh_count())
            .finish()
    }
}

impl RefreshCoordinator {
    pub fn new(refresher: Arc<dyn Refresher>, hook: Arc<dyn SessionHook>) -> Self {
        Self {
            refresher,
            hook,
            timeout: None,
            state: Mutex::new(RefreshState::Idle),
            refreshes: AtomicU64::new(0),
        }
    }

    /// Bound each refresh call. Expiry counts as a refresh failure.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(*self.lock_state(), RefreshState::Refreshing { .. })
    }

    /// Callers currently suspended behind the in-flight refresh (the leader excluded).
    pub fn pending_waiters(&self) -> usize {
        match &*self.lock_state() {
            RefreshState::Idle => 0,
            RefreshState::Refreshing { waiters } => waiters.len(),
        }
    }

    /// Refresh calls started since construction.
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::SeqCst)
    }

    /// Wait for a renewed session, starting the refresh if none is running.
    ///
    /// Every caller of one refresh window gets the same outcome. A failed
    /// refresh surfaces as [`BidlinkError::RefreshFailed`] to all of them,
    /// and the session hook runs once for the whole window.
    pub async fn await_refresh(&self) -> Result<(), BidlinkError> {
        let role = {
            let mut state = self.lock_state();
            match &mut *state {
                RefreshState::Idle => {
                    *state = RefreshState::Refreshing {
                        waiters: VecDeque::new(),
                    };
                    Role::Leader
                }
                RefreshState::Refreshing { waiters } => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push_back(tx);
                    tracing::debug!(waiters = waiters.len(), "queued behind in-flight session refresh");
                    Role::Waiter(rx)
                }
            }
        };

        match role {
            Role::Leader => self.lead().await,
            Role::Waiter(rx) => match rx.await {
                Ok(outcome) => outcome.map_err(BidlinkError::RefreshFailed),
                // The sender only disappears if the coordinator itself is gone.
                Err(_) => Err(BidlinkError::RefreshFailed(Arc::new(BidlinkError::Cancelled))),
            },
        }
    }

    async fn lead(&self) -> Result<(), BidlinkError> {
        let mut guard = LeaderGuard {
            coordinator: self,
            armed: true,
        };
        let refresh_count = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(refresh_count, "starting session refresh");

        let result = match self.timeout {
            Some(timeout) => with_timeout(timeout, self.refresher.refresh()).await,
            None => self.refresher.refresh().await,
        };
        guard.armed = false;

        match result {
            Ok(()) => {
                let released = self.settle(Ok(()));
                tracing::info!(refresh_count, waiters = released, "session refreshed");
                Ok(())
            }
            Err(error) => {
                let error = Arc::new(error);
                tracing::warn!(refresh_count, error = %error, "session refresh failed");
                // Runs before the state returns to Idle; late arrivals join this batch.
                self.hook.deauthenticate(&error);
                let rejected = self.settle(Err(error.clone()));
                tracing::debug!(waiters = rejected, "rejected queued requests");
                Err(BidlinkError::RefreshFailed(error))
            }
        }
    }

    /// Return to `Idle`, settling every waiter under the same lock.
    fn settle(&self, outcome: RefreshOutcome) -> usize {
        let mut state = self.lock_state();
        let waiters = match std::mem::replace(&mut *state, RefreshState::Idle) {
            RefreshState::Idle => VecDeque::new(),
            RefreshState::Refreshing { waiters } => waiters,
        };
        let count = waiters.len();
        for waiter in waiters {
            // A dropped receiver means that caller went away; nothing to deliver.
            let _ = waiter.send(outcome.clone());
        }
        count
    }

    fn lock_state(&self) -> MutexGuard<'_, RefreshState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Releases the waiters if the leading future is dropped mid-refresh.
struct LeaderGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    armed: bool,
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!("session refresh abandoned by its leader");
            self.coordinator
                .settle(Err(Arc::new(BidlinkError::Cancelled)));
        }
    }
}
