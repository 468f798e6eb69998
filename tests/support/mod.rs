#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bidlink::auth::SessionHook;
use bidlink::client::{AuthenticatedClient, HttpResponse, RequestSpec, Transport};
use bidlink::error::BidlinkError;
use bidlink::refresh::{RefreshCoordinator, Refresher};
use reqwest::StatusCode;
use serde_json::json;
use tokio::sync::Notify;

/// Transport that answers from per-path status scripts and records every send.
///
/// A path with an exhausted (or missing) script answers 200.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<u16>>>,
    log: Mutex<Vec<(String, bool)>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, path: &str, statuses: &[u16]) {
        self.scripts
            .lock()
            .expect("scripts lock poisoned")
            .insert(path.to_string(), statuses.iter().copied().collect());
    }

    /// `(path, retried)` for every send, in dispatch order.
    pub fn log(&self) -> Vec<(String, bool)> {
        self.log.lock().expect("log lock poisoned").clone()
    }

    pub fn sends_for(&self, path: &str) -> usize {
        self.log().iter().filter(|(p, _)| p == path).count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &RequestSpec) -> Result<HttpResponse, BidlinkError> {
        self.log
            .lock()
            .expect("log lock poisoned")
            .push((request.path.clone(), request.retried));
        let status = self
            .scripts
            .lock()
            .expect("scripts lock poisoned")
            .get_mut(&request.path)
            .and_then(VecDeque::pop_front)
            .unwrap_or(200);
        let body = if status < 400 {
            json!({ "success": true, "data": { "path": request.path } })
        } else {
            json!({ "success": false, "message": format!("status {status}") })
        };
        Ok(HttpResponse::new(
            StatusCode::from_u16(status).expect("valid status"),
            body.to_string(),
        ))
    }
}

/// Refresher that blocks until released, then succeeds or fails.
pub struct GatedRefresher {
    gate: Notify,
    gated: bool,
    calls: AtomicUsize,
    failure: Mutex<Option<fn() -> BidlinkError>>,
}

impl GatedRefresher {
    pub fn gated() -> Arc<Self> {
        Arc::new(Self::build(true))
    }

    pub fn immediate() -> Arc<Self> {
        Arc::new(Self::build(false))
    }

    fn build(gated: bool) -> Self {
        Self {
            gate: Notify::new(),
            gated,
            calls: AtomicUsize::new(0),
            failure: Mutex::new(None),
        }
    }

    pub fn failing_with(self: Arc<Self>, make: fn() -> BidlinkError) -> Arc<Self> {
        *self.failure.lock().expect("failure lock poisoned") = Some(make);
        self
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Refresher for GatedRefresher {
    async fn refresh(&self) -> Result<(), BidlinkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.gated {
            self.gate.notified().await;
        }
        let failure = *self.failure.lock().expect("failure lock poisoned");
        match failure {
            Some(make) => Err(make()),
            None => Ok(()),
        }
    }
}

/// Session hook that only counts invocations.
#[derive(Default)]
pub struct CountingHook {
    hits: AtomicUsize,
}

impl CountingHook {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl SessionHook for CountingHook {
    fn deauthenticate(&self, _reason: &BidlinkError) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn client_with(
    transport: Arc<ScriptedTransport>,
    refresher: Arc<GatedRefresher>,
    hook: Arc<CountingHook>,
) -> AuthenticatedClient {
    let coordinator = Arc::new(RefreshCoordinator::new(refresher, hook));
    AuthenticatedClient::new(transport, coordinator)
}

/// Yield until the refresh is in flight with `waiters` callers queued behind it.
pub async fn until_queued(client: &AuthenticatedClient, waiters: usize) {
    loop {
        let coordinator = client.coordinator();
        if coordinator.is_refreshing() && coordinator.pending_waiters() == waiters {
            return;
        }
        tokio::task::yield_now().await;
    }
}
