//! RSA request signing for Shopino Gate
//!
//! This crate owns the outbound half of the protocol: the RSA keypair, the
//! canonical form of a request, the signature over it, and an HTTP client
//! that attaches that signature to calls against the store API.
//!
//! ```no_run
//! use shopino_signing::{CanonicalPayload, Keypair, sign, verify_signature};
//!
//! # fn main() -> shopino_signing::Result<()> {
//! let keypair = Keypair::load_or_generate("private.pem")?;
//! let payload = CanonicalPayload::from_params([("per_page", "10"), ("page", "1")]);
//!
//! let envelope = sign(payload.as_bytes(), &keypair)?;
//! assert!(verify_signature(payload.as_bytes(), &envelope, keypair.public_key()));
//! # Ok(())
//! # }
//! ```

pub mod canonical;
pub mod client;
pub mod config;
pub mod error;
pub mod keys;
pub mod signer;

pub use canonical::{
    CanonicalPayload, canonical_json, canonical_query, canonicalize_json_bytes,
    canonicalize_query_string,
};
pub use client::{SignedClient, SignedRequest, decode_response};
pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_BASE_URL, DEFAULT_SIGNATURE_HEADER};
pub use error::{Result, SigningError};
pub use keys::{KEY_BITS, Keypair, PUBLIC_EXPONENT, load_public_key, public_key_from_pem};
pub use signer::{
    HmacSigner, PayloadSigner, RequestSigner, RsaVerifier, SignatureAlgorithm, SignatureEnvelope,
    sign, verify_signature,
};

pub use rsa::{RsaPrivateKey, RsaPublicKey};
