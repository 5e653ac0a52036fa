//! Configuration for the signed API client

use crate::Result;
use shopino_config::{ConfigValidator, EnvLoader, Validate};
use std::path::PathBuf;
use std::time::Duration;

/// Default store API root.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/wp-json/api/v1";

/// Default header carrying the request signature.
pub const DEFAULT_SIGNATURE_HEADER: &str = "X-Shopino-Signature";

/// Configuration for [`SignedClient`](crate::SignedClient)
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// API root every request path is joined onto
    pub base_url: String,

    /// PEM file holding the private key
    pub private_key_path: PathBuf,

    /// Header the base64 signature is sent in
    pub signature_header: String,

    /// Request timeout
    pub timeout: Duration,

    /// User-Agent header for outgoing requests
    pub user_agent: String,

    /// Add a `timestamp` query parameter (unix seconds) to GET requests
    pub add_timestamp: bool,

    /// Path of the endpoint that receives the webhook secret
    pub webhook_key_path: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            private_key_path: PathBuf::from("private.pem"),
            signature_header: DEFAULT_SIGNATURE_HEADER.to_string(),
            timeout: Duration::from_secs(30),
            user_agent: format!("Shopino-Gate/{}", env!("CARGO_PKG_VERSION")),
            add_timestamp: true,
            webhook_key_path: "/webhook-key".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Read overrides from the environment.
    ///
    /// Recognised keys (with the loader's prefix): `API_BASE_URL`,
    /// `PRIVATE_KEY_PATH`, `SIGNATURE_HEADER`, `CLIENT_TIMEOUT_SECS`,
    /// `ADD_TIMESTAMP`. Anything unset keeps its default.
    pub fn from_env(loader: &EnvLoader) -> Result<Self> {
        let defaults = Self::default();
        let timeout = loader
            .load_parsed::<u64>("client_timeout_secs")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        let config = Self {
            base_url: loader.load_var_or("api_base_url", &defaults.base_url),
            private_key_path: loader
                .load_opt("private_key_path")
                .map(PathBuf::from)
                .unwrap_or(defaults.private_key_path),
            signature_header: loader.load_var_or("signature_header", &defaults.signature_header),
            timeout,
            user_agent: defaults.user_agent,
            add_timestamp: loader.load_bool("add_timestamp").unwrap_or(defaults.add_timestamp),
            webhook_key_path: defaults.webhook_key_path,
        };
        config.validate()?;
        Ok(config)
    }
}

impl Validate for ClientConfig {
    fn validate(&self) -> shopino_config::Result<()> {
        ConfigValidator::is_url(&self.base_url, "api_base_url")?;
        ConfigValidator::is_header_name(&self.signature_header, "signature_header")?;
        ConfigValidator::in_range(self.timeout.as_secs(), 1, 600, "client_timeout_secs")?;
        ConfigValidator::not_empty(&self.user_agent, "user_agent")
    }
}

/// Builder for ClientConfig
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    pub fn private_key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.private_key_path = path.into();
        self
    }

    pub fn signature_header(mut self, header: impl Into<String>) -> Self {
        self.config.signature_header = header.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout = Duration::from_secs(secs);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn add_timestamp(mut self, enabled: bool) -> Self {
        self.config.add_timestamp = enabled;
        self
    }

    pub fn webhook_key_path(mut self, path: impl Into<String>) -> Self {
        self.config.webhook_key_path = path.into();
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SigningError;

    fn loader(vars: &[(&str, &str)]) -> EnvLoader {
        EnvLoader::from_vars(Some("SHOPINO".to_string()), vars.iter().copied())
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8080/wp-json/api/v1");
        assert_eq!(config.private_key_path, PathBuf::from("private.pem"));
        assert_eq!(config.signature_header, "X-Shopino-Signature");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.add_timestamp);
        assert!(config.user_agent.starts_with("Shopino-Gate/"));
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::builder()
            .base_url("https://shop.example.com/wp-json/api/v1")
            .timeout_secs(5)
            .add_timestamp(false)
            .build();

        assert_eq!(config.base_url, "https://shop.example.com/wp-json/api/v1");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(!config.add_timestamp);
    }

    #[test]
    fn test_from_env_defaults() {
        let config = ClientConfig::from_env(&loader(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_from_env_overrides() {
        let config = ClientConfig::from_env(&loader(&[
            ("SHOPINO_API_BASE_URL", "https://shop.example.com/api"),
            ("SHOPINO_PRIVATE_KEY_PATH", "/etc/shopino/key.pem"),
            ("SHOPINO_CLIENT_TIMEOUT_SECS", "10"),
            ("SHOPINO_ADD_TIMESTAMP", "0"),
        ]))
        .unwrap();

        assert_eq!(config.base_url, "https://shop.example.com/api");
        assert_eq!(config.private_key_path, PathBuf::from("/etc/shopino/key.pem"));
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(!config.add_timestamp);
    }

    #[test]
    fn test_from_env_rejects_bad_values() {
        let bad_url = ClientConfig::from_env(&loader(&[("SHOPINO_API_BASE_URL", "localhost")]));
        assert!(matches!(bad_url, Err(SigningError::Config(_))));

        let bad_timeout =
            ClientConfig::from_env(&loader(&[("SHOPINO_CLIENT_TIMEOUT_SECS", "soon")]));
        assert!(matches!(bad_timeout, Err(SigningError::Config(_))));

        let bad_header =
            ClientConfig::from_env(&loader(&[("SHOPINO_SIGNATURE_HEADER", "X Bad Header")]));
        assert!(matches!(bad_header, Err(SigningError::Config(_))));
    }
}
