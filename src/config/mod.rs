//! Configuration system (layered: code > env > config file > defaults).

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;
use strum::{Display, EnumString};

use crate::error::BidlinkError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_AUTH_PATH: &str = "auth";
pub const DEFAULT_REFRESH_PATH: &str = "auth/refresh-token";
pub const DEFAULT_PROFILE: &str = "default";

/// How credentials travel with each request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, Deserialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum CredentialMode {
    /// HTTP-only cookies set by the server and replayed from the cookie jar.
    #[default]
    Cookie,
    /// `Authorization: Bearer` from a [`TokenStore`](crate::auth::TokenStore).
    Bearer,
}

/// Client configuration.
///
/// Resolution order:
/// 1. Explicit `with_*` calls
/// 2. `BIDLINK_*` environment variables (a `.env` file is honoured)
/// 3. `config.toml` in the platform config directory
/// 4. Built-in defaults
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub auth_path: String,
    pub refresh_path: String,
    pub credentials: CredentialMode,
    pub timeout: Duration,
    pub refresh_timeout: Duration,
    pub user_agent: String,
    pub profile: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            auth_path: DEFAULT_AUTH_PATH.to_string(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            credentials: CredentialMode::default(),
            timeout: Duration::from_secs(30),
            refresh_timeout: Duration::from_secs(15),
            user_agent: concat!("bidlink/", env!("CARGO_PKG_VERSION")).to_string(),
            profile: DEFAULT_PROFILE.to_string(),
        }
    }
}

/// On-disk shape of `config.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    base_url: Option<String>,
    auth_path: Option<String>,
    refresh_path: Option<String>,
    credentials: Option<CredentialMode>,
    timeout_secs: Option<u64>,
    refresh_timeout_secs: Option<u64>,
    user_agent: Option<String>,
    profile: Option<String>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::default().with_base_url(base_url)
    }

    /// Load file and environment layers on top of the defaults.
    pub fn load() -> Result<Self, BidlinkError> {
        let _ = dotenvy::dotenv();
        let mut config = Self::default();
        if let Some(path) = Self::default_file_path() {
            if path.exists() {
                config = config.merge_file(&path)?;
            }
        }
        config.apply_env_with(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Path of the user config file, if the platform has a config directory.
    pub fn default_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "bidlink")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Overlay the keys present in a TOML file.
    pub fn merge_file(mut self, path: &Path) -> Result<Self, BidlinkError> {
        let raw = std::fs::read_to_string(path)?;
        let file: ConfigFile = toml::from_str(&raw).map_err(|e| {
            BidlinkError::Configuration(format!("{}: {e}", path.display()))
        })?;
        if let Some(v) = file.base_url {
            self.base_url = v;
        }
        if let Some(v) = file.auth_path {
            self.auth_path = v;
        }
        if let Some(v) = file.refresh_path {
            self.refresh_path = v;
        }
        if let Some(v) = file.credentials {
            self.credentials = v;
        }
        if let Some(v) = file.timeout_secs {
            self.timeout = Duration::from_secs(v);
        }
        if let Some(v) = file.refresh_timeout_secs {
            self.refresh_timeout = Duration::from_secs(v);
        }
        if let Some(v) = file.user_agent {
            self.user_agent = v;
        }
        if let Some(v) = file.profile {
            self.profile = v;
        }
        Ok(self)
    }

    /// Overlay `BIDLINK_*` variables resolved through `lookup`.
    pub fn apply_env_with(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), BidlinkError> {
        if let Some(v) = lookup("BIDLINK_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = lookup("BIDLINK_AUTH_PATH") {
            self.auth_path = v;
        }
        if let Some(v) = lookup("BIDLINK_REFRESH_PATH") {
            self.refresh_path = v;
        }
        if let Some(v) = lookup("BIDLINK_CREDENTIALS") {
            self.credentials = v.parse().map_err(|_| {
                BidlinkError::Configuration(format!(
                    "BIDLINK_CREDENTIALS must be `cookie` or `bearer`, got `{v}`"
                ))
            })?;
        }
        if let Some(v) = lookup("BIDLINK_TIMEOUT_SECS") {
            self.timeout = parse_secs("BIDLINK_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("BIDLINK_REFRESH_TIMEOUT_SECS") {
            self.refresh_timeout = parse_secs("BIDLINK_REFRESH_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("BIDLINK_PROFILE") {
            self.profile = v;
        }
        Ok(())
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_auth_path(mut self, path: impl Into<String>) -> Self {
        self.auth_path = path.into();
        self
    }

    pub fn with_refresh_path(mut self, path: impl Into<String>) -> Self {
        self.refresh_path = path.into();
        self
    }

    pub fn with_credentials(mut self, mode: CredentialMode) -> Self {
        self.credentials = mode;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    pub fn validate(&self) -> Result<(), BidlinkError> {
        self.base()?;
        if self.timeout.is_zero() || self.refresh_timeout.is_zero() {
            return Err(BidlinkError::Configuration(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Base URL, normalized to end with `/` so relative joins keep its path.
    pub fn base(&self) -> Result<Url, BidlinkError> {
        let mut raw = self.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let url = Url::parse(&raw).map_err(|e| {
            BidlinkError::Configuration(format!("invalid base URL `{}`: {e}", self.base_url))
        })?;
        if url.cannot_be_a_base() {
            return Err(BidlinkError::Configuration(format!(
                "base URL `{}` cannot carry paths",
                self.base_url
            )));
        }
        Ok(url)
    }

    /// Path of an endpoint under the auth prefix, e.g. `auth/login`.
    pub fn auth_endpoint(&self, name: &str) -> String {
        format!("{}/{}", self.auth_path.trim_matches('/'), name)
    }
}

fn parse_secs(key: &str, value: &str) -> Result<Duration, BidlinkError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| BidlinkError::Configuration(format!("{key} must be whole seconds, got `{value}`")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn env_overrides_defaults() {
        let mut config = ClientConfig::default();
        config
            .apply_env_with(lookup(&[
                ("BIDLINK_BASE_URL", "https://api.example.com/v1"),
                ("BIDLINK_CREDENTIALS", "Bearer"),
                ("BIDLINK_TIMEOUT_SECS", "5"),
                ("BIDLINK_PROFILE", "work"),
            ]))
            .unwrap();

        assert_eq!(config.base_url, "https://api.example.com/v1");
        assert_eq!(config.credentials, CredentialMode::Bearer);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.profile, "work");
        assert_eq!(config.refresh_path, DEFAULT_REFRESH_PATH);
    }

    #[test]
    fn invalid_env_values_are_configuration_errors() {
        let mut config = ClientConfig::default();
        let err = config
            .apply_env_with(lookup(&[("BIDLINK_CREDENTIALS", "kerberos")]))
            .unwrap_err();
        assert!(matches!(err, BidlinkError::Configuration(_)));

        let err = config
            .apply_env_with(lookup(&[("BIDLINK_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, BidlinkError::Configuration(_)));
    }

    #[test]
    fn file_layer_applies_present_keys_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "base_url = \"https://market.test/api\"\ncredentials = \"bearer\"\nrefresh_timeout_secs = 3\n",
        )
        .unwrap();

        let config = ClientConfig::default().merge_file(&path).unwrap();

        assert_eq!(config.base_url, "https://market.test/api");
        assert_eq!(config.credentials, CredentialMode::Bearer);
        assert_eq!(config.refresh_timeout, Duration::from_secs(3));
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn file_layer_rejects_unknown_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "base_uri = \"typo\"\n").unwrap();
        let err = ClientConfig::default().merge_file(&path).unwrap_err();
        assert!(matches!(err, BidlinkError::Configuration(_)));
    }

    #[test]
    fn base_keeps_path_prefix_for_joins() {
        let config = ClientConfig::new("http://localhost:5000/api");
        let url = config.base().unwrap().join("auth/login").unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/auth/login");
    }

    #[test]
    fn validate_rejects_bad_url_and_zero_timeout() {
        assert!(ClientConfig::new("not a url").validate().is_err());
        assert!(ClientConfig::default()
            .with_timeout(Duration::ZERO)
            .validate()
            .is_err());
        assert!(ClientConfig::default().validate().is_ok());
    }

    #[test]
    fn auth_endpoint_trims_slashes() {
        let config = ClientConfig::default().with_auth_path("/users/");
        assert_eq!(config.auth_endpoint("login"), "users/login");
    }
}
