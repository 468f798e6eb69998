use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::BidlinkError;

/// Replayable description of one API call.
///
/// `retried` is flipped by the client the first time the request is replayed
/// after a session refresh. A second 401 on a retried request is terminal.
///
/// # Example
/// ```
/// use bidlink::client::RequestSpec;
///
/// let spec = RequestSpec::post("projects/42/bids")
///     .json(serde_json::json!({ "amount": 250 }))
///     .query("notify", "true");
/// assert!(!spec.retried);
/// ```
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    /// Path relative to the configured base URL, or an absolute URL.
    pub path: String,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub retried: bool,
    /// Whether a 401 on this request may start a session refresh.
    pub refresh_on_unauthorized: bool,
    pub request_id: Uuid,
}

impl RequestSpec {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
            retried: false,
            refresh_on_unauthorized: true,
            request_id: Uuid::new_v4(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize any payload into the JSON body.
    pub fn try_json<T: Serialize + ?Sized>(self, body: &T) -> Result<Self, BidlinkError> {
        Ok(self.json(serde_json::to_value(body)?))
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Surface a 401 as [`BidlinkError::Unauthorized`] instead of refreshing.
    ///
    /// Used for the login, register and refresh endpoints themselves.
    pub fn without_refresh(mut self) -> Self {
        self.refresh_on_unauthorized = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clones_keep_identity_and_flags() {
        let spec = RequestSpec::get("notifications").without_refresh();
        let mut replay = spec.clone();
        replay.retried = true;

        assert_eq!(replay.request_id, spec.request_id);
        assert!(!replay.refresh_on_unauthorized);
        assert!(!spec.retried);
    }

    #[test]
    fn try_json_serializes_payload() {
        #[derive(Serialize)]
        struct Bid {
            amount: u32,
        }
        let spec = RequestSpec::post("bids").try_json(&Bid { amount: 40 }).unwrap();
        assert_eq!(spec.body, Some(json!({ "amount": 40 })));
        assert_eq!(spec.method, Method::POST);
    }
}
