use serde::Serialize;
use serde_json::Value;

use crate::auth::{AuthError, SessionState, Token};
use crate::client::{AuthenticatedClient, RequestSpec};
use crate::config::CredentialMode;
use crate::error::BidlinkError;

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

/// Session lifecycle endpoints: register, login, logout, current user.
///
/// Obtained from [`AuthenticatedClient::auth`].
#[derive(Debug)]
pub struct AuthApi<'a> {
    client: &'a AuthenticatedClient,
    session: &'a SessionState,
}

impl AuthenticatedClient {
    pub fn auth<'a>(&'a self, session: &'a SessionState) -> AuthApi<'a> {
        AuthApi {
            client: self,
            session,
        }
    }
}

impl AuthApi<'_> {
    fn endpoint(&self, name: &str) -> String {
        self.client.config().auth_endpoint(name)
    }

    /// Create an account. The payload shape is defined by the server.
    pub async fn register<P: Serialize + ?Sized>(&self, payload: &P) -> Result<Value, BidlinkError> {
        let spec = RequestSpec::post(self.endpoint("register"))
            .try_json(payload)?
            .without_refresh();
        self.client.send_data(spec).await
    }

    /// Log in and mark the session authenticated with the returned user.
    pub async fn login(&self, email: &str, password: &str) -> Result<Value, BidlinkError> {
        let spec = RequestSpec::post(self.endpoint("login"))
            .try_json(&Credentials { email, password })?
            .without_refresh();
        let data: Value = self.client.send_data(spec).await?;

        if self.client.config().credentials == CredentialMode::Bearer {
            self.store_tokens(&data)?;
        }
        let user = data.get("user").cloned().unwrap_or_else(|| data.clone());
        self.session.authenticate(user.clone());
        tracing::info!("logged in");
        Ok(user)
    }

    /// Log out on the server, then end the local session regardless of the outcome.
    pub async fn logout(&self) -> Result<(), BidlinkError> {
        let result = self
            .client
            .request(RequestSpec::post(self.endpoint("logout")))
            .await;
        self.session.clear();
        if let Some(store) = self.client.token_store() {
            store.clear(&self.client.config().profile)?;
        }
        result.map(|_| ())
    }

    /// Fetch the logged-in user. Goes through the refresh flow on 401.
    pub async fn current_user(&self) -> Result<Value, BidlinkError> {
        let data: Value = self.client.get_data(&self.endpoint("me")).await?;
        let user = data.get("user").cloned().unwrap_or(data);
        self.session.authenticate(user.clone());
        Ok(user)
    }

    fn store_tokens(&self, data: &Value) -> Result<(), BidlinkError> {
        let access = data
            .get("accessToken")
            .and_then(Value::as_str)
            .ok_or_else(|| AuthError::InvalidResponse("login response has no accessToken".to_string()))?;
        let mut token = Token::new(access);
        if let Some(refresh) = data.get("refreshToken").and_then(Value::as_str) {
            token = token.with_refresh_token(refresh);
        }
        let store = self.client.token_store().ok_or_else(|| {
            BidlinkError::Configuration("bearer credentials need a token store".to_string())
        })?;
        store.save(&self.client.config().profile, &token)?;
        Ok(())
    }
}
