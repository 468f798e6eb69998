//! Wire transport behind the authenticated client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::Url;

use super::request::RequestSpec;
use super::response::HttpResponse;
use crate::auth::TokenStore;
use crate::config::{ClientConfig, CredentialMode};
use crate::error::BidlinkError;

/// Sends one request and buffers the response.
///
/// Implementations return `Ok` for every HTTP status. Only failures to get a
/// response at all (connect, timeout, body read) are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &RequestSpec) -> Result<HttpResponse, BidlinkError>;
}

/// reqwest-backed transport with a cookie jar and optional bearer credentials.
pub struct ReqwestTransport {
    client: reqwest::Client,
    base: Url,
    timeout: Duration,
    credentials: CredentialMode,
    store: Option<Arc<dyn TokenStore>>,
    profile: String,
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("base", &self.base.as_str())
            .field("credentials", &self.credentials)
            .field("profile", &self.profile)
            .finish()
    }
}

impl ReqwestTransport {
    /// Build a transport for `config`.
    ///
    /// Bearer mode requires a token store to read credentials from.
    pub fn new(
        config: &ClientConfig,
        store: Option<Arc<dyn TokenStore>>,
    ) -> Result<Self, BidlinkError> {
        config.validate()?;
        if config.credentials == CredentialMode::Bearer && store.is_none() {
            return Err(BidlinkError::Configuration(
                "bearer credentials need a token store".to_string(),
            ));
        }
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .pool_max_idle_per_host(10)
            .build()?;
        Ok(Self {
            client,
            base: config.base()?,
            timeout: config.timeout,
            credentials: config.credentials,
            store,
            profile: config.profile.clone(),
        })
    }

    /// Resolve `path` against the API base.
    ///
    /// Absolute URLs are accepted only on the API's own origin, so session
    /// credentials never leave it.
    pub fn resolve(&self, path: &str) -> Result<Url, BidlinkError> {
        let invalid = |e: &dyn std::fmt::Display| {
            BidlinkError::InvalidArgument(format!("invalid request path `{path}`: {e}"))
        };
        if path.contains("://") {
            let url = Url::parse(path).map_err(|e| invalid(&e))?;
            if url.origin() != self.base.origin() {
                return Err(BidlinkError::InvalidArgument(format!(
                    "`{path}` is outside the API origin {}",
                    self.base.origin().ascii_serialization()
                )));
            }
            return Ok(url);
        }
        // `./` keeps segments like `gigs:featured` from parsing as a scheme.
        self.base
            .join(&format!("./{}", path.trim_start_matches('/')))
            .map_err(|e| invalid(&e))
    }

    fn bearer(&self) -> Result<Option<HeaderValue>, BidlinkError> {
        if self.credentials != CredentialMode::Bearer {
            return Ok(None);
        }
        let Some(store) = &self.store else {
            return Ok(None);
        };
        let Some(token) = store.load(&self.profile)? else {
            return Ok(None);
        };
        HeaderValue::from_str(&format!("Bearer {}", token.access_token))
            .map(Some)
            .map_err(|_| BidlinkError::InvalidArgument("access token is not a valid header value".to_string()))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &RequestSpec) -> Result<HttpResponse, BidlinkError> {
        let url = self.resolve(&request.path)?;
        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .headers(request.headers.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        // Read per attempt, so a replay picks up the token a refresh just stored.
        if let Some(value) = self.bearer()? {
            builder = builder.header(AUTHORIZATION, value);
        }

        let response = builder.send().await.map_err(|e| self.map_error(e))?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(|e| self.map_error(e))?;
        tracing::debug!(
            request_id = %request.request_id,
            status = status.as_u16(),
            "response received"
        );
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

impl ReqwestTransport {
    fn map_error(&self, error: reqwest::Error) -> BidlinkError {
        if error.is_timeout() {
            BidlinkError::Timeout(self.timeout.as_millis() as u64)
        } else {
            BidlinkError::Network(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{MemoryTokenStore, Token};

    #[test]
    fn bearer_mode_requires_store() {
        let config = ClientConfig::default().with_credentials(CredentialMode::Bearer);
        let err = ReqwestTransport::new(&config, None).unwrap_err();
        assert!(matches!(err, BidlinkError::Configuration(_)));
    }

    #[test]
    fn resolve_joins_relative_and_keeps_same_origin_absolute() {
        let transport =
            ReqwestTransport::new(&ClientConfig::new("https://market.test/api"), None).unwrap();
        assert_eq!(
            transport.resolve("/projects/7").unwrap().as_str(),
            "https://market.test/api/projects/7"
        );
        assert_eq!(
            transport.resolve("https://market.test/uploads/x").unwrap().as_str(),
            "https://market.test/uploads/x"
        );
    }

    #[test]
    fn resolve_rejects_foreign_origins() {
        let transport =
            ReqwestTransport::new(&ClientConfig::new("https://market.test/api"), None).unwrap();
        for foreign in [
            "https://cdn.test/x",
            "http://market.test/api/projects",
            "https://market.test:8443/api/projects",
        ] {
            assert!(
                matches!(transport.resolve(foreign), Err(BidlinkError::InvalidArgument(_))),
                "{foreign}"
            );
        }
    }

    #[test]
    fn resolve_joins_scheme_like_segments() {
        let transport =
            ReqwestTransport::new(&ClientConfig::new("https://market.test/api"), None).unwrap();
        assert_eq!(
            transport.resolve("gigs:featured").unwrap().as_str(),
            "https://market.test/api/gigs:featured"
        );
        assert_eq!(
            transport.resolve("mailto:ada@example.com").unwrap().as_str(),
            "https://market.test/api/mailto:ada@example.com"
        );
    }

    #[test]
    fn bearer_header_comes_from_store() {
        let store = Arc::new(MemoryTokenStore::new());
        store.save("default", &Token::new("abc")).unwrap();
        let config = ClientConfig::default().with_credentials(CredentialMode::Bearer);
        let transport = ReqwestTransport::new(&config, Some(store)).unwrap();
        assert_eq!(
            transport.bearer().unwrap().unwrap(),
            HeaderValue::from_static("Bearer abc")
        );
    }

    #[test]
    fn cookie_mode_sends_no_bearer() {
        let store = Arc::new(MemoryTokenStore::new());
        store.save("default", &Token::new("abc")).unwrap();
        let transport = ReqwestTransport::new(&ClientConfig::default(), Some(store)).unwrap();
        assert!(transport.bearer().unwrap().is_none());
    }
}
