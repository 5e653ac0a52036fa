//! Webhook signature generation and verification

use crate::{Result, WebhookError};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use shopino_config::ConfigError;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

/// How the HMAC tag is written in the signature header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagEncoding {
    /// Lowercase hex of the raw MAC
    #[default]
    Hex,

    /// Standard padded base64 of the raw MAC (what WooCommerce sends)
    Base64,
}

impl TagEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagEncoding::Hex => "hex",
            TagEncoding::Base64 => "base64",
        }
    }

    fn encode(&self, tag: &[u8]) -> String {
        match self {
            TagEncoding::Hex => hex::encode(tag),
            TagEncoding::Base64 => BASE64.encode(tag),
        }
    }
}

impl fmt::Display for TagEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TagEncoding {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hex" => Ok(TagEncoding::Hex),
            "base64" => Ok(TagEncoding::Base64),
            other => Err(format!("unknown tag encoding: {}", other)),
        }
    }
}

/// HMAC-SHA256 over the exact raw body with a shared secret.
///
/// An empty secret counts as no secret: nothing verifies and nothing can be
/// signed.
#[derive(Clone)]
pub struct WebhookSignature {
    secret: Arc<[u8]>,
    encoding: TagEncoding,
}

impl fmt::Debug for WebhookSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookSignature")
            .field("has_secret", &self.has_secret())
            .field("encoding", &self.encoding)
            .finish()
    }
}

impl WebhookSignature {
    /// Create a new signature utility with the given secret
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: Arc::from(secret.as_ref()),
            encoding: TagEncoding::default(),
        }
    }

    /// Use a different tag encoding
    pub fn with_encoding(mut self, encoding: TagEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn encoding(&self) -> TagEncoding {
        self.encoding
    }

    pub fn has_secret(&self) -> bool {
        !self.secret.is_empty()
    }

    /// Encoded tag for `payload`
    pub fn sign(&self, payload: &[u8]) -> Result<String> {
        self.compute(payload).ok_or_else(|| {
            WebhookError::Config(ConfigError::ValidationError(
                "webhook secret is not set".to_string(),
            ))
        })
    }

    /// Check a received tag in constant time. Never errors; `false` for a
    /// missing secret or any mismatch.
    pub fn verify(&self, payload: &[u8], tag: &str) -> bool {
        match self.compute(payload) {
            Some(expected) => constant_time_compare(tag.trim(), &expected),
            None => false,
        }
    }

    fn compute(&self, payload: &[u8]) -> Option<String> {
        if !self.has_secret() {
            return None;
        }
        let mut mac = HmacSha256::new_from_slice(&self.secret).ok()?;
        mac.update(payload);
        Some(self.encoding.encode(&mac.finalize().into_bytes()))
    }
}

/// Verify a hex HMAC-SHA256 tag of `raw_body` under `secret`.
pub fn verify(raw_body: &[u8], provided_tag: &str, secret: impl AsRef<[u8]>) -> bool {
    WebhookSignature::new(secret).verify(raw_body, provided_tag)
}

/// Constant-time string comparison to prevent timing attacks
pub(crate) fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

/// Header names used by WooCommerce deliveries
pub mod headers {
    /// The HMAC tag of the raw body
    pub const SIGNATURE: &str = "X-WC-Webhook-Signature";

    /// `{resource}.{action}` topic
    pub const TOPIC: &str = "X-WC-Webhook-Topic";

    /// Per-delivery identifier
    pub const DELIVERY_ID: &str = "X-WC-Webhook-Delivery-ID";

    /// Identifier of the webhook registration
    pub const WEBHOOK_ID: &str = "X-WC-Webhook-ID";

    pub const CONTENT_TYPE: &str = "Content-Type";
}

#[cfg(test)]
mod tests {
    use super::*;

    // echo -n 'The quick brown fox jumps over the lazy dog' | openssl dgst -sha256 -hmac key
    const FOX: &[u8] = b"The quick brown fox jumps over the lazy dog";
    const FOX_HEX: &str = "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8";

    #[test]
    fn test_known_vector_hex() {
        let signer = WebhookSignature::new("key");
        assert_eq!(signer.sign(FOX).unwrap(), FOX_HEX);
        assert!(signer.verify(FOX, FOX_HEX));
    }

    #[test]
    fn test_known_vector_base64() {
        let signer = WebhookSignature::new("key").with_encoding(TagEncoding::Base64);
        let tag = signer.sign(FOX).unwrap();

        assert_eq!(tag, BASE64.encode(hex::decode(FOX_HEX).unwrap()));
        assert!(signer.verify(FOX, &tag));
        assert!(!signer.verify(FOX, FOX_HEX));
    }

    #[test]
    fn test_verify_wrong_secret() {
        let tag = WebhookSignature::new("secret1").sign(b"test payload").unwrap();
        assert!(!WebhookSignature::new("secret2").verify(b"test payload", &tag));
    }

    #[test]
    fn test_verify_tolerates_surrounding_whitespace() {
        assert!(WebhookSignature::new("key").verify(FOX, &format!(" {}\n", FOX_HEX)));
    }

    #[test]
    fn test_single_bit_flip_rejected() {
        let signer = WebhookSignature::new("key");
        let mut raw = hex::decode(FOX_HEX).unwrap();
        for byte in 0..raw.len() {
            for bit in 0..8 {
                raw[byte] ^= 1 << bit;
                assert!(!signer.verify(FOX, &hex::encode(&raw)));
                raw[byte] ^= 1 << bit;
            }
        }
    }

    #[test]
    fn test_empty_secret_fails_closed() {
        let signer = WebhookSignature::new("");
        assert!(!signer.has_secret());
        assert!(signer.sign(FOX).is_err());
        assert!(!signer.verify(FOX, FOX_HEX));
        assert!(!signer.verify(FOX, ""));
    }

    #[test]
    fn test_free_verify() {
        assert!(verify(FOX, FOX_HEX, "key"));
        assert!(!verify(FOX, FOX_HEX, ""));
        assert!(!verify(b"", FOX_HEX, "key"));
    }

    #[test]
    fn test_free_verify_with_binary_secret() {
        let secret = [0x00u8, 0xff, 0x10, 0x80];
        let tag = WebhookSignature::new(secret).sign(FOX).unwrap();

        assert!(verify(FOX, &tag, secret));
        assert!(verify(FOX, &tag, secret.to_vec()));
        assert!(!verify(FOX, &tag, &secret[..3]));
    }

    #[test]
    fn test_tag_encoding_from_str() {
        assert_eq!("HEX".parse::<TagEncoding>().unwrap(), TagEncoding::Hex);
        assert_eq!("base64".parse::<TagEncoding>().unwrap(), TagEncoding::Base64);
        assert!("base32".parse::<TagEncoding>().is_err());
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "ab"));
        assert!(!constant_time_compare("", "a"));
    }
}
