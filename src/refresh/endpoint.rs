use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use super::Refresher;
use crate::auth::{AuthError, Token, TokenStore};
use crate::client::{RequestSpec, Transport};
use crate::config::{ClientConfig, CredentialMode};
use crate::error::BidlinkError;

/// Refreshes the session by calling the API's refresh endpoint.
///
/// In cookie mode the request carries no body and the server renews the
/// session cookies. In bearer mode the stored refresh token is posted and the
/// returned tokens replace the stored ones.
pub struct EndpointRefresher {
    transport: Arc<dyn Transport>,
    path: String,
    credentials: CredentialMode,
    store: Option<Arc<dyn TokenStore>>,
    profile: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshedTokens {
    access_token: String,
    refresh_token: Option<String>,
}

impl EndpointRefresher {
    pub fn new(
        transport: Arc<dyn Transport>,
        config: &ClientConfig,
        store: Option<Arc<dyn TokenStore>>,
    ) -> Self {
        Self {
            transport,
            path: config.refresh_path.clone(),
            credentials: config.credentials,
            store,
            profile: config.profile.clone(),
        }
    }

    fn bearer_store(&self) -> Result<&Arc<dyn TokenStore>, BidlinkError> {
        self.store.as_ref().ok_or_else(|| {
            BidlinkError::Configuration("bearer credentials need a token store".to_string())
        })
    }
}

#[async_trait]
impl Refresher for EndpointRefresher {
    async fn refresh(&self) -> Result<(), BidlinkError> {
        let mut spec = RequestSpec::post(self.path.clone()).without_refresh();
        let previous = match self.credentials {
            CredentialMode::Cookie => None,
            CredentialMode::Bearer => {
                let token = self
                    .bearer_store()?
                    .load(&self.profile)?
                    .ok_or(AuthError::NotLoggedIn)?;
                let refresh_token = token.refresh_token.clone().ok_or(AuthError::NotLoggedIn)?;
                spec = spec.json(json!({ "refreshToken": refresh_token }));
                Some(token)
            }
        };

        let response = self.transport.send(&spec).await?;
        if response.status == StatusCode::UNAUTHORIZED {
            return Err(BidlinkError::Unauthorized {
                message: response.error_message(),
            });
        }
        if !response.is_success() {
            return Err(response.into_error());
        }

        if let Some(previous) = previous {
            let renewed: RefreshedTokens = response.data().map_err(|e| match e {
                BidlinkError::Serialization(inner) => {
                    BidlinkError::InvalidResponse(format!("refresh response: {inner}"))
                }
                other => other,
            })?;
            let token = Token {
                access_token: renewed.access_token,
                refresh_token: renewed.refresh_token.or(previous.refresh_token),
                expires_at: None,
                last_refresh: Some(Utc::now()),
            };
            self.bearer_store()?.save(&self.profile, &token)?;
        }
        Ok(())
    }
}
