//! Webhook receiver for authenticating incoming deliveries

use crate::{Result, TagEncoding, WebhookError, WebhookSignature, headers};
use std::collections::HashMap;
use tracing::{debug, warn};

/// An incoming delivery as handed over by the HTTP layer.
#[derive(Debug, Clone, Default)]
pub struct InboundRequest {
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl InboundRequest {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn from_parts(headers: HashMap<String, String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            headers,
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .or_else(|| {
                self.headers
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(name))
                    .map(|(_, v)| v)
            })
            .map(String::as_str)
    }

    /// Header value with surrounding whitespace removed; empty counts as absent.
    pub fn header_trimmed(&self, name: &str) -> Option<&str> {
        self.header(name).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

/// Authenticates deliveries against the shared secret
#[derive(Debug, Clone)]
pub struct WebhookReceiver {
    signature: WebhookSignature,
    signature_header: String,
}

impl WebhookReceiver {
    /// Create a new receiver with the given secret
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            signature: WebhookSignature::new(secret),
            signature_header: headers::SIGNATURE.to_string(),
        }
    }

    /// Receiver with no secret. Every delivery is rejected.
    pub fn without_secret() -> Self {
        Self::new(b"")
    }

    pub fn with_encoding(mut self, encoding: TagEncoding) -> Self {
        self.signature = self.signature.with_encoding(encoding);
        self
    }

    pub fn with_signature_header(mut self, header: impl Into<String>) -> Self {
        self.signature_header = header.into();
        self
    }

    pub fn signature(&self) -> &WebhookSignature {
        &self.signature
    }

    /// Verify a tag against a body
    pub fn verify(&self, payload: &[u8], tag: &str) -> bool {
        self.signature.verify(payload, tag)
    }

    /// Authenticate a delivery.
    ///
    /// The signature header is checked before the body is touched: a missing
    /// or empty header is [`WebhookError::AuthenticationMissing`], a wrong tag
    /// or an unconfigured secret is [`WebhookError::AuthenticationInvalid`].
    pub fn authenticate(&self, request: &InboundRequest) -> Result<()> {
        let tag = request
            .header_trimmed(&self.signature_header)
            .ok_or(WebhookError::AuthenticationMissing)?;

        if !self.signature.has_secret() {
            warn!("webhook secret is not configured, rejecting delivery");
            return Err(WebhookError::AuthenticationInvalid);
        }

        if self.signature.verify(request.body(), tag) {
            debug!(len = request.body().len(), "webhook signature verified");
            Ok(())
        } else {
            Err(WebhookError::AuthenticationInvalid)
        }
    }
}
