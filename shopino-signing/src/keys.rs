//! RSA key management
//!
//! The private key lives in a single unencrypted PEM file. PKCS#8 is written;
//! both PKCS#8 and legacy PKCS#1 are accepted on load.

use crate::{Result, SigningError};
use rand::rngs::OsRng;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;
use tracing::{debug, info};

/// Modulus size of generated keys.
pub const KEY_BITS: usize = 2048;

/// Public exponent of generated keys.
pub const PUBLIC_EXPONENT: u64 = 65537;

/// An RSA keypair owned by the signing process.
#[derive(Clone)]
pub struct Keypair {
    private_key: RsaPrivateKey,
    public_key: RsaPublicKey,
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair")
            .field("modulus_bits", &self.modulus_bits())
            .field("public_exponent", &self.public_exponent())
            .field("private_key", &"<redacted>")
            .finish()
    }
}

impl Keypair {
    /// Generate a fresh 2048-bit keypair with e = 65537 from the OS RNG.
    pub fn generate() -> Result<Self> {
        let private_key = RsaPrivateKey::new(&mut OsRng, KEY_BITS)
            .map_err(|e| SigningError::KeyGeneration(e.to_string()))?;
        info!(bits = KEY_BITS, "generated RSA keypair");
        Ok(Self::from_private_key(private_key))
    }

    /// Wrap an existing private key.
    pub fn from_private_key(private_key: RsaPrivateKey) -> Self {
        let public_key = RsaPublicKey::from(&private_key);
        Self {
            private_key,
            public_key,
        }
    }

    /// Load a private key from a PEM file.
    ///
    /// Fails with [`SigningError::KeyNotFound`] when the file does not exist
    /// and [`SigningError::KeyFormat`] when it is neither PKCS#8 nor PKCS#1.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(SigningError::KeyNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        let pem = String::from_utf8(bytes)
            .map_err(|_| SigningError::KeyFormat("key file is not valid PEM text".to_string()))?;

        let keypair = Self::from_pem(&pem)?;
        debug!(path = %path.display(), "loaded private key");
        Ok(keypair)
    }

    /// Parse a PEM private key, trying PKCS#8 first and PKCS#1 second.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let private_key = match RsaPrivateKey::from_pkcs8_pem(pem) {
            Ok(key) => {
                debug!("private key is PKCS#8");
                key
            }
            Err(pkcs8_err) => {
                debug!(error = %pkcs8_err, "PKCS#8 parse failed, trying PKCS#1");
                RsaPrivateKey::from_pkcs1_pem(pem).map_err(|pkcs1_err| {
                    SigningError::KeyFormat(format!(
                        "not PKCS#8 ({}) or PKCS#1 ({})",
                        pkcs8_err, pkcs1_err
                    ))
                })?
            }
        };
        Ok(Self::from_private_key(private_key))
    }

    /// Load the key at `path`, or generate and persist one if the file is
    /// missing.
    pub fn load_or_generate(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match Self::load(path) {
            Err(SigningError::KeyNotFound(_)) => {
                let keypair = Self::generate()?;
                keypair.persist(path)?;
                info!(path = %path.display(), "persisted new private key");
                Ok(keypair)
            }
            other => other,
        }
    }

    /// Write the private key as unencrypted PKCS#8 PEM, replacing any
    /// existing file. On Unix the file mode is `0600`.
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let pem = self
            .private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| SigningError::KeyFormat(e.to_string()))?;

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(path)?;
        file.write_all(pem.as_bytes())?;
        file.sync_all()?;

        // mode() only applies on creation
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    /// Export the public key as SubjectPublicKeyInfo PEM.
    pub fn public_key_pem(&self) -> Result<String> {
        self.public_key
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| SigningError::KeyFormat(e.to_string()))
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    /// Modulus size in bits.
    pub fn modulus_bits(&self) -> usize {
        self.public_key.size() * 8
    }

    pub fn public_exponent(&self) -> u64 {
        self.public_key
            .e()
            .to_bytes_be()
            .iter()
            .fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
    }
}

/// Load a public key from PEM text, SubjectPublicKeyInfo first, PKCS#1 second.
pub fn public_key_from_pem(pem: &str) -> Result<RsaPublicKey> {
    RsaPublicKey::from_public_key_pem(pem)
        .or_else(|spki_err| {
            RsaPublicKey::from_pkcs1_pem(pem).map_err(|pkcs1_err| {
                SigningError::KeyFormat(format!(
                    "not SubjectPublicKeyInfo ({}) or PKCS#1 ({})",
                    spki_err, pkcs1_err
                ))
            })
        })
}

/// Load a public key from a PEM file.
pub fn load_public_key(path: impl AsRef<Path>) -> Result<RsaPublicKey> {
    let path = path.as_ref();
    let pem = match fs::read_to_string(path) {
        Ok(pem) => pem,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(SigningError::KeyNotFound(path.to_path_buf()));
        }
        Err(e) if e.kind() == ErrorKind::InvalidData => {
            return Err(SigningError::KeyFormat("key file is not valid PEM text".to_string()));
        }
        Err(e) => return Err(e.into()),
    };
    public_key_from_pem(&pem)
}
