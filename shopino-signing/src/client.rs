//! Signed calls against the store API

use crate::{
    CanonicalPayload, ClientConfig, Keypair, PayloadSigner, RequestSigner, Result,
    SignatureEnvelope, SigningError,
};
use chrono::Utc;
use reqwest::{Client, Method};
use serde::Serialize;
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Longest response body kept in an [`SigningError::UnexpectedStatus`].
const MAX_ERROR_BODY: usize = 1024;

/// A request that has been canonicalized and signed but not yet sent.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub method: Method,
    pub url: Url,
    /// Exact bytes sent as the body, if any
    pub body: Option<Vec<u8>>,
    pub canonical: CanonicalPayload,
    pub envelope: SignatureEnvelope,
}

/// HTTP client that signs every request it sends.
///
/// GET requests sign their sorted, form-encoded query string. POST requests
/// sign the key-sorted JSON body and send those same bytes.
#[derive(Clone)]
pub struct SignedClient {
    config: ClientConfig,
    http_client: Client,
    signer: Arc<dyn PayloadSigner>,
}

impl fmt::Debug for SignedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedClient")
            .field("config", &self.config)
            .field("algorithm", &self.signer.algorithm())
            .finish()
    }
}

impl SignedClient {
    /// Create a client around an existing signer.
    pub fn new(config: ClientConfig, signer: Arc<dyn PayloadSigner>) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            config,
            http_client,
            signer,
        })
    }

    /// Create a client that signs with the RSA key at
    /// `config.private_key_path`.
    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let keypair = Keypair::load(&config.private_key_path)?;
        Self::with_keypair(config, &keypair)
    }

    pub fn with_keypair(config: ClientConfig, keypair: &Keypair) -> Result<Self> {
        Self::new(config, Arc::new(RequestSigner::new(keypair)))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let joined = format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Ok(Url::parse(&joined)?)
    }

    /// Canonicalize and sign a GET request.
    ///
    /// A `timestamp` parameter is added when enabled and not already present.
    pub fn prepare_get<I, K, V>(&self, path: &str, params: I) -> Result<SignedRequest>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut pairs: Vec<(String, String)> = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        if self.config.add_timestamp && !pairs.iter().any(|(k, _)| k == "timestamp") {
            pairs.push(("timestamp".to_string(), Utc::now().timestamp().to_string()));
        }

        let canonical = CanonicalPayload::from_params(pairs);
        let envelope = self.signer.sign(canonical.as_bytes())?;

        let mut url = self.endpoint(path)?;
        match &canonical {
            CanonicalPayload::Query(query) if !query.is_empty() => {
                url.set_query(Some(query.as_str()))
            }
            _ => url.set_query(None),
        }

        Ok(SignedRequest {
            method: Method::GET,
            url,
            body: None,
            canonical,
            envelope,
        })
    }

    /// Canonicalize and sign a JSON POST request.
    pub fn prepare_post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<SignedRequest> {
        let canonical = CanonicalPayload::from_json(body)?;
        let envelope = self.signer.sign(canonical.as_bytes())?;

        Ok(SignedRequest {
            method: Method::POST,
            url: self.endpoint(path)?,
            body: Some(canonical.as_bytes().to_vec()),
            canonical,
            envelope,
        })
    }

    /// Signed GET returning the decoded JSON response.
    pub async fn get<I, K, V>(&self, path: &str, params: I) -> Result<Value>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let request = self.prepare_get(path, params)?;
        self.send(request).await
    }

    /// Signed JSON POST returning the decoded JSON response.
    pub async fn post_json<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<Value> {
        let request = self.prepare_post_json(path, body)?;
        self.send(request).await
    }

    /// Share the webhook HMAC secret with the store.
    pub async fn register_webhook_secret(&self, secret: &str) -> Result<Value> {
        let path = self.config.webhook_key_path.clone();
        let response = self.post_json(&path, &json!({ "secret": secret })).await?;
        info!("registered webhook secret with store");
        Ok(response)
    }

    /// Send a prepared request.
    pub async fn send(&self, request: SignedRequest) -> Result<Value> {
        debug!(
            method = %request.method,
            url = %request.url,
            algorithm = %request.envelope.algorithm,
            "sending signed request"
        );

        let mut builder = self
            .http_client
            .request(request.method.clone(), request.url.clone())
            .header(
                self.config.signature_header.as_str(),
                request.envelope.header_value(),
            );
        if let Some(body) = request.body {
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!(
                status = status.as_u16(),
                url = %request.url,
                "signed request rejected"
            );
            return Err(SigningError::UnexpectedStatus {
                status: status.as_u16(),
                body: text.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        Ok(decode_response(&text))
    }
}

/// Decode a response body as JSON.
///
/// Some store endpoints return a JSON string that itself holds JSON; that
/// inner document is unwrapped. Non-JSON bodies come back as a string value.
pub fn decode_response(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    match serde_json::from_str::<Value>(text) {
        Ok(Value::String(inner)) => {
            serde_json::from_str(&inner).unwrap_or(Value::String(inner))
        }
        Ok(value) => value,
        Err(_) => Value::String(text.to_string()),
    }
}
