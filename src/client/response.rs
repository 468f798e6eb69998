use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::BidlinkError;

/// The API's response convention: `{ success, data, message }`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default = "default_success")]
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

fn default_success() -> bool {
    true
}

/// A fully buffered HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, BidlinkError> {
        Ok(serde_json::from_str(&self.body)?)
    }

    pub fn envelope<T: DeserializeOwned>(&self) -> Result<ApiEnvelope<T>, BidlinkError> {
        self.json()
    }

    /// Decode the envelope and return its `data`.
    ///
    /// `success: false` becomes [`BidlinkError::Api`] with the envelope message.
    pub fn data<T: DeserializeOwned>(&self) -> Result<T, BidlinkError> {
        let envelope: ApiEnvelope<T> = self.envelope()?;
        if !envelope.success {
            return Err(BidlinkError::api(
                self.status.as_u16(),
                envelope.message.unwrap_or_else(|| "request unsuccessful".to_string()),
            ));
        }
        envelope
            .data
            .ok_or_else(|| BidlinkError::InvalidResponse("response envelope has no data".to_string()))
    }

    /// Best human-readable reason for a failed response.
    pub fn error_message(&self) -> String {
        if let Ok(envelope) = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(&self.body) {
            if let Some(message) = envelope.message.filter(|m| !m.is_empty()) {
                return message;
            }
        }
        let trimmed = self.body.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
        self.status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    }

    pub fn into_error(self) -> BidlinkError {
        BidlinkError::api(self.status.as_u16(), self.error_message())
    }
}
