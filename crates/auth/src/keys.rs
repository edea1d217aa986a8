//! Verification key material.
//!
//! The auth server hands out its RSA public key as a PEM block labelled
//! `PUBLIC KEY`. Depending on the server version the DER body is either a bare
//! PKCS#1 `RSAPublicKey` or a PKIX `SubjectPublicKeyInfo`, so both are tried.

use jsonwebtoken::DecodingKey;
use rsa::RsaPublicKey;
use rsa::pkcs1::{DecodeRsaPublicKey, EncodeRsaPublicKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::traits::PublicKeyParts;
use thiserror::Error;

const PUBLIC_KEY_TAG: &str = "PUBLIC KEY";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// Empty input, broken PEM framing, or a block that is not `PUBLIC KEY`.
    #[error("invalid public key PEM: {0}")]
    Format(String),

    /// The PEM body is neither PKCS#1 nor PKIX RSA key material.
    #[error("unable to parse RSA public key: {0}")]
    Parse(String),
}

/// Which DER encoding the key was found in.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum KeyEncoding {
    Pkcs1,
    Pkix,
}

/// An RSA public key ready to check RS256 signatures.
#[derive(Clone)]
pub struct VerifierKey {
    decoding: DecodingKey,
    encoding: KeyEncoding,
    modulus_bits: usize,
}

impl VerifierKey {
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }

    pub fn encoding(&self) -> KeyEncoding {
        self.encoding
    }

    pub fn modulus_bits(&self) -> usize {
        self.modulus_bits
    }
}

impl core::fmt::Debug for VerifierKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VerifierKey")
            .field("encoding", &self.encoding)
            .field("modulus_bits", &self.modulus_bits)
            .finish_non_exhaustive()
    }
}

/// Convert a PEM-encoded RSA public key into a [`VerifierKey`].
///
/// PKCS#1 is attempted first, then PKIX. Deterministic and side-effect free.
pub fn load_public_key(pem_str: &str) -> Result<VerifierKey, KeyError> {
    if pem_str.trim().is_empty() {
        return Err(KeyError::Format("empty input".to_string()));
    }

    let block = pem::parse(pem_str).map_err(|e| KeyError::Format(e.to_string()))?;
    if block.tag() != PUBLIC_KEY_TAG {
        return Err(KeyError::Format(format!(
            "expected {PUBLIC_KEY_TAG} block, found {}",
            block.tag()
        )));
    }

    let der = block.contents();
    let (key, encoding) = match RsaPublicKey::from_pkcs1_der(der) {
        Ok(key) => (key, KeyEncoding::Pkcs1),
        Err(_) => {
            let key = RsaPublicKey::from_public_key_der(der)
                .map_err(|e| KeyError::Parse(e.to_string()))?;
            (key, KeyEncoding::Pkix)
        }
    };

    // jsonwebtoken wants PKCS#1 DER regardless of how the key arrived.
    let pkcs1 = key
        .to_pkcs1_der()
        .map_err(|e| KeyError::Parse(e.to_string()))?;

    tracing::debug!(?encoding, bits = key.size() * 8, "loaded verifier key");

    Ok(VerifierKey {
        decoding: DecodingKey::from_rsa_der(pkcs1.as_bytes()),
        encoding,
        modulus_bits: key.size() * 8,
    })
}
