//! Payload signing and signature verification

use crate::{Keypair, Result, SigningError};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use rsa::RsaPublicKey;
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Supported signature schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    /// RSA PKCS#1 v1.5 over SHA-256 (default)
    #[serde(rename = "RSA-SHA256-PKCS1v15")]
    RsaSha256Pkcs1v15,

    /// HMAC-SHA256 with a shared secret
    #[serde(rename = "HMAC-SHA256")]
    HmacSha256,
}

impl SignatureAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RsaSha256Pkcs1v15 => "RSA-SHA256-PKCS1v15",
            Self::HmacSha256 => "HMAC-SHA256",
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = SigningError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "RSA-SHA256-PKCS1v15" => Ok(Self::RsaSha256Pkcs1v15),
            "HMAC-SHA256" => Ok(Self::HmacSha256),
            other => Err(SigningError::Signing(format!(
                "unknown signature algorithm: {}",
                other
            ))),
        }
    }
}

/// A signature ready to travel in a single header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureEnvelope {
    pub algorithm: SignatureAlgorithm,

    /// Base64 (standard alphabet, padded) signature bytes
    pub value: String,
}

impl SignatureEnvelope {
    pub fn new(algorithm: SignatureAlgorithm, value: impl Into<String>) -> Self {
        Self {
            algorithm,
            value: value.into(),
        }
    }

    /// Wrap a header value received for a known algorithm.
    pub fn from_header(algorithm: SignatureAlgorithm, header: &str) -> Self {
        Self::new(algorithm, header.trim())
    }

    /// Header value to transmit.
    pub fn header_value(&self) -> &str {
        &self.value
    }

    /// Decode the raw signature bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        BASE64
            .decode(self.value.trim())
            .map_err(|e| SigningError::Encoding(e.to_string()))
    }
}

/// Something that can sign canonical payloads.
///
/// The signed API client takes this as an injected capability so tests can
/// substitute their own signer and keys can be swapped without touching
/// callers.
pub trait PayloadSigner: Send + Sync {
    fn algorithm(&self) -> SignatureAlgorithm;

    fn sign(&self, payload: &[u8]) -> Result<SignatureEnvelope>;
}

/// RSA-SHA256-PKCS1v15 signer holding the private key.
#[derive(Clone)]
pub struct RequestSigner {
    signing_key: SigningKey<Sha256>,
}

impl RequestSigner {
    pub fn new(keypair: &Keypair) -> Self {
        Self {
            signing_key: SigningKey::<Sha256>::new(keypair.private_key().clone()),
        }
    }
}

impl fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner").finish_non_exhaustive()
    }
}

impl PayloadSigner for RequestSigner {
    fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::RsaSha256Pkcs1v15
    }

    /// Sign the raw payload. The PKCS#1 v1.5 primitive hashes internally, so
    /// the payload is never pre-hashed here.
    fn sign(&self, payload: &[u8]) -> Result<SignatureEnvelope> {
        debug!(
            digest = %hex::encode(Sha256::digest(payload)),
            len = payload.len(),
            "signing payload"
        );
        let signature = self
            .signing_key
            .try_sign(payload)
            .map_err(|e| SigningError::Signing(e.to_string()))?;
        Ok(SignatureEnvelope::new(
            self.algorithm(),
            BASE64.encode(signature.to_bytes()),
        ))
    }
}

/// Verifies RSA-SHA256-PKCS1v15 envelopes with the public key.
#[derive(Debug, Clone)]
pub struct RsaVerifier {
    verifying_key: VerifyingKey<Sha256>,
}

impl RsaVerifier {
    pub fn new(public_key: RsaPublicKey) -> Self {
        Self {
            verifying_key: VerifyingKey::<Sha256>::new(public_key),
        }
    }

    /// `true` only for a well-formed RSA envelope that matches `payload`.
    pub fn verify(&self, payload: &[u8], envelope: &SignatureEnvelope) -> bool {
        if envelope.algorithm != SignatureAlgorithm::RsaSha256Pkcs1v15 {
            return false;
        }
        let Ok(bytes) = envelope.decode() else {
            return false;
        };
        let Ok(signature) = Signature::try_from(bytes.as_slice()) else {
            return false;
        };
        self.verifying_key.verify(payload, &signature).is_ok()
    }
}

/// Sign `payload` with the keypair's private key.
pub fn sign(payload: &[u8], keypair: &Keypair) -> Result<SignatureEnvelope> {
    RequestSigner::new(keypair).sign(payload)
}

/// Check an RSA envelope against `payload` with `public_key`.
pub fn verify_signature(
    payload: &[u8],
    envelope: &SignatureEnvelope,
    public_key: &RsaPublicKey,
) -> bool {
    RsaVerifier::new(public_key.clone()).verify(payload, envelope)
}

/// HMAC-SHA256 signer for deployments that share a secret on both sides.
///
/// The tag is base64 of the raw MAC, which is what the store plugin puts in
/// its own webhook deliveries.
#[derive(Clone)]
pub struct HmacSigner {
    secret: Vec<u8>,
}

impl HmacSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self, payload: &[u8]) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| SigningError::Signing(e.to_string()))?;
        mac.update(payload);
        Ok(mac)
    }

    /// Constant-time check of an HMAC envelope.
    pub fn verify(&self, payload: &[u8], envelope: &SignatureEnvelope) -> bool {
        if envelope.algorithm != SignatureAlgorithm::HmacSha256 {
            return false;
        }
        match (envelope.decode(), self.mac(payload)) {
            (Ok(tag), Ok(mac)) => mac.verify_slice(&tag).is_ok(),
            _ => false,
        }
    }
}

impl fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacSigner").finish_non_exhaustive()
    }
}

impl PayloadSigner for HmacSigner {
    fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::HmacSha256
    }

    fn sign(&self, payload: &[u8]) -> Result<SignatureEnvelope> {
        let tag = self.mac(payload)?.finalize().into_bytes();
        Ok(SignatureEnvelope::new(self.algorithm(), BASE64.encode(tag)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_names() {
        assert_eq!(
            SignatureAlgorithm::RsaSha256Pkcs1v15.to_string(),
            "RSA-SHA256-PKCS1v15"
        );
        assert_eq!(
            "HMAC-SHA256".parse::<SignatureAlgorithm>().unwrap(),
            SignatureAlgorithm::HmacSha256
        );
        assert!("MD5".parse::<SignatureAlgorithm>().is_err());
    }

    #[test]
    fn test_envelope_serialization() {
        let envelope = SignatureEnvelope::new(SignatureAlgorithm::HmacSha256, "AAAA");
        let json = serde_json::to_string(&envelope).unwrap();
        assert_eq!(json, r#"{"algorithm":"HMAC-SHA256","value":"AAAA"}"#);
    }

    #[test]
    fn test_hmac_sign_and_verify() {
        let signer = HmacSigner::new("local_host");
        let envelope = signer.sign(br#"{"secret":"local_host"}"#).unwrap();

        assert_eq!(envelope.algorithm, SignatureAlgorithm::HmacSha256);
        assert!(signer.verify(br#"{"secret":"local_host"}"#, &envelope));
        assert!(!signer.verify(br#"{"secret":"other"}"#, &envelope));
        assert!(!HmacSigner::new("other").verify(br#"{"secret":"local_host"}"#, &envelope));
    }

    #[test]
    fn test_hmac_is_deterministic() {
        let signer = HmacSigner::new("secret");
        assert_eq!(signer.sign(b"payload").unwrap(), signer.sign(b"payload").unwrap());
    }

    #[test]
    fn test_hmac_rejects_wrong_algorithm_and_garbage() {
        let signer = HmacSigner::new("secret");
        let mut envelope = signer.sign(b"payload").unwrap();

        envelope.algorithm = SignatureAlgorithm::RsaSha256Pkcs1v15;
        assert!(!signer.verify(b"payload", &envelope));

        let garbage = SignatureEnvelope::new(SignatureAlgorithm::HmacSha256, "!!not base64!!");
        assert!(!signer.verify(b"payload", &garbage));
    }
}
