//! Authenticated HTTP client with transparent session refresh.

pub mod request;
pub mod response;
pub mod transport;

pub use request::RequestSpec;
pub use response::{ApiEnvelope, HttpResponse};
pub use transport::{ReqwestTransport, Transport};

use std::sync::Arc;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::auth::{SessionHook, TokenStore};
use crate::config::ClientConfig;
use crate::error::BidlinkError;
use crate::refresh::{EndpointRefresher, RefreshCoordinator, Refresher};

/// Issues API requests and recovers from expired sessions.
///
/// A 401 on a request that has not been replayed yet parks it behind the
/// [`RefreshCoordinator`]. Once the session is renewed the request is sent
/// again, exactly once. Every other failure reaches the caller untouched.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use bidlink::auth::SessionState;
/// use bidlink::client::AuthenticatedClient;
/// use bidlink::config::ClientConfig;
///
/// # async fn example() -> bidlink::error::Result<()> {
/// let session = SessionState::new();
/// let client = AuthenticatedClient::builder(ClientConfig::load()?, Arc::new(session)).build()?;
/// let projects: serde_json::Value = client.get_data("projects").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AuthenticatedClient {
    transport: Arc<dyn Transport>,
    coordinator: Arc<RefreshCoordinator>,
    config: ClientConfig,
    store: Option<Arc<dyn TokenStore>>,
}

impl std::fmt::Debug for AuthenticatedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedClient")
            .field("coordinator", &self.coordinator)
            .field("config", &self.config)
            .field("token_store", &self.store.as_ref().map(|_| ".."))
            .finish()
    }
}

impl AuthenticatedClient {
    /// Wire a client from explicit parts.
    pub fn new(transport: Arc<dyn Transport>, coordinator: Arc<RefreshCoordinator>) -> Self {
        Self {
            transport,
            coordinator,
            config: ClientConfig::default(),
            store: None,
        }
    }

    /// Build the standard reqwest-backed client for `config`.
    ///
    /// The session hook is required: it is what tells the rest of the
    /// application that the session is gone when a refresh fails.
    pub fn builder(config: ClientConfig, hook: Arc<dyn SessionHook>) -> ClientBuilder {
        ClientBuilder {
            config,
            hook,
            store: None,
            refresher: None,
        }
    }

    pub fn with_config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn token_store(&self) -> Option<&Arc<dyn TokenStore>> {
        self.store.as_ref()
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    /// Send `spec`, refreshing the session at most once on 401.
    pub async fn request(&self, mut spec: RequestSpec) -> Result<HttpResponse, BidlinkError> {
        loop {
            tracing::debug!(
                request_id = %spec.request_id,
                method = %spec.method,
                path = %spec.path,
                retried = spec.retried,
                "dispatching request"
            );
            let response = self.transport.send(&spec).await?;
            if response.is_success() {
                return Ok(response);
            }
            if response.status != StatusCode::UNAUTHORIZED {
                return Err(response.into_error());
            }

            let message = response.error_message();
            if !spec.refresh_on_unauthorized {
                return Err(BidlinkError::Unauthorized { message });
            }
            if spec.retried {
                tracing::warn!(
                    request_id = %spec.request_id,
                    path = %spec.path,
                    "request unauthorized after session refresh"
                );
                return Err(BidlinkError::UnauthorizedAfterRetry { message });
            }

            spec.retried = true;
            tracing::debug!(
                request_id = %spec.request_id,
                path = %spec.path,
                "unauthorized, waiting for session refresh"
            );
            self.coordinator.await_refresh().await?;
        }
    }

    pub async fn get(&self, path: &str) -> Result<HttpResponse, BidlinkError> {
        self.request(RequestSpec::get(path)).await
    }

    pub async fn delete(&self, path: &str) -> Result<HttpResponse, BidlinkError> {
        self.request(RequestSpec::delete(path)).await
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<HttpResponse, BidlinkError> {
        self.request(RequestSpec::post(path).try_json(body)?).await
    }

    pub async fn put<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<HttpResponse, BidlinkError> {
        self.request(RequestSpec::put(path).try_json(body)?).await
    }

    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<HttpResponse, BidlinkError> {
        self.request(RequestSpec::patch(path).try_json(body)?).await
    }

    /// GET `path` and unwrap the response envelope.
    pub async fn get_data<T: DeserializeOwned>(&self, path: &str) -> Result<T, BidlinkError> {
        self.get(path).await?.data()
    }

    /// Send `spec` and unwrap the response envelope.
    pub async fn send_data<T: DeserializeOwned>(&self, spec: RequestSpec) -> Result<T, BidlinkError> {
        self.request(spec).await?.data()
    }
}

/// Builder for the reqwest-backed [`AuthenticatedClient`].
pub struct ClientBuilder {
    config: ClientConfig,
    hook: Arc<dyn SessionHook>,
    store: Option<Arc<dyn TokenStore>>,
    refresher: Option<Arc<dyn Refresher>>,
}

impl ClientBuilder {
    /// Token store for bearer credentials.
    pub fn token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace the default refresh-endpoint call.
    pub fn refresher(mut self, refresher: Arc<dyn Refresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    pub fn build(self) -> Result<AuthenticatedClient, BidlinkError> {
        let transport: Arc<dyn Transport> =
            Arc::new(ReqwestTransport::new(&self.config, self.store.clone())?);
        let refresher: Arc<dyn Refresher> = match self.refresher {
            Some(refresher) => refresher,
            None => Arc::new(EndpointRefresher::new(
                transport.clone(),
                &self.config,
                self.store.clone(),
            )),
        };
        let coordinator = RefreshCoordinator::new(refresher, self.hook)
            .with_timeout(self.config.refresh_timeout);
        Ok(AuthenticatedClient {
            transport,
            coordinator: Arc::new(coordinator),
            config: self.config,
            store: self.store,
        })
    }
}
