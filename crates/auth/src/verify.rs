//! Access-token verification.
//!
//! Checks run in a fixed order: structure and algorithm, then the signature,
//! then time validity and issuer. No claim value is trusted before the
//! signature has been checked.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, Validation};
use serde::Deserialize;
use thiserror::Error;

use crate::claims::{AuthenticatedUser, RawUserClaims, reshape_active_org};
use crate::keys::{KeyError, VerifierKey, load_public_key};

/// The only signing algorithm accepted.
pub const TRUSTED_ALGORITHM: &str = "RS256";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("unsupported signing algorithm '{0}'")]
    UnsupportedAlgorithm(String),

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token has no expiration")]
    MissingExpiration,

    #[error("token has expired")]
    Expired,

    #[error("token not yet valid")]
    NotYetValid,

    #[error("token issuer does not match")]
    IssuerMismatch,

    #[error("token verification failed: {0}")]
    Unknown(String),
}

/// Public key and expected issuer for one auth server.
///
/// Immutable once built; share it freely between threads.
#[derive(Debug, Clone)]
pub struct VerificationConfig {
    key: VerifierKey,
    issuer: String,
}

impl VerificationConfig {
    pub fn new(key: VerifierKey, issuer: impl Into<String>) -> Self {
        Self {
            key,
            issuer: issuer.into(),
        }
    }

    pub fn from_pem(issuer: impl Into<String>, verifier_key_pem: &str) -> Result<Self, KeyError> {
        Ok(Self::new(load_public_key(verifier_key_pem)?, issuer))
    }

    pub fn key(&self) -> &VerifierKey {
        &self.key
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }
}

/// Turns a raw bearer token into a verified user.
///
/// The clock is an argument so callers (and tests) control "now".
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<AuthenticatedUser, TokenError>;
}

/// RS256 verifier backed by `jsonwebtoken`.
#[derive(Debug, Clone)]
pub struct RsaTokenVerifier {
    config: VerificationConfig,
    validation: Validation,
}

impl RsaTokenVerifier {
    pub fn new(config: VerificationConfig) -> Self {
        Self {
            config,
            validation: signature_only_validation(),
        }
    }

    pub fn config(&self) -> &VerificationConfig {
        &self.config
    }
}

impl TokenVerifier for RsaTokenVerifier {
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<AuthenticatedUser, TokenError> {
        verify_with(token, &self.config, &self.validation, now).inspect_err(|e| {
            tracing::debug!(reason = %e, issuer = %self.config.issuer, "rejected access token");
        })
    }
}

/// Verify `token` against `config` at time `now`.
pub fn verify(
    token: &str,
    config: &VerificationConfig,
    now: DateTime<Utc>,
) -> Result<AuthenticatedUser, TokenError> {
    verify_with(token, config, &signature_only_validation(), now)
}

/// `jsonwebtoken` only checks the signature here; registered claims are
/// checked afterwards against the caller's clock.
fn signature_only_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.leeway = 0;
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    validation
}

#[derive(Deserialize)]
struct JoseHeader {
    alg: String,
}

#[derive(Deserialize)]
struct RegisteredClaims {
    #[serde(default)]
    iss: Option<String>,
    #[serde(default)]
    exp: Option<i64>,
    #[serde(default)]
    nbf: Option<i64>,
}

fn verify_with(
    token: &str,
    config: &VerificationConfig,
    validation: &Validation,
    now: DateTime<Utc>,
) -> Result<AuthenticatedUser, TokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    let [header, payload, _signature] = segments.as_slice() else {
        return Err(TokenError::Malformed(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    };

    let header_bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|e| TokenError::Malformed(format!("header: {e}")))?;
    let header: JoseHeader = serde_json::from_slice(&header_bytes)
        .map_err(|e| TokenError::Malformed(format!("header: {e}")))?;
    if header.alg != TRUSTED_ALGORITHM {
        return Err(TokenError::UnsupportedAlgorithm(header.alg));
    }

    // With header and payload known to decode, any base64 failure reported
    // below can only come from the signature segment.
    URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| TokenError::Malformed(format!("payload: {e}")))?;

    let data = jsonwebtoken::decode::<serde_json::Value>(
        token,
        config.key().decoding_key(),
        validation,
    )
    .map_err(map_jwt_error)?;
    let claims = data.claims;

    let registered = RegisteredClaims::deserialize(&claims)
        .map_err(|e| TokenError::Unknown(format!("registered claims: {e}")))?;
    check_time_window(registered.exp, registered.nbf, now)?;
    if registered.iss.as_deref() != Some(config.issuer()) {
        return Err(TokenError::IssuerMismatch);
    }

    let raw: RawUserClaims = serde_json::from_value(claims)
        .map_err(|e| TokenError::Unknown(format!("user claims: {e}")))?;
    Ok(reshape_active_org(raw))
}

/// Expiry is mandatory; `nbf` is optional.
fn check_time_window(
    exp: Option<i64>,
    nbf: Option<i64>,
    now: DateTime<Utc>,
) -> Result<(), TokenError> {
    let now = now.timestamp();
    let exp = exp.ok_or(TokenError::MissingExpiration)?;
    if now >= exp {
        return Err(TokenError::Expired);
    }
    if nbf.is_some_and(|nbf| now < nbf) {
        return Err(TokenError::NotYetValid);
    }
    Ok(())
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> TokenError {
    match err.kind() {
        ErrorKind::InvalidSignature | ErrorKind::Base64(_) => TokenError::InvalidSignature,
        ErrorKind::InvalidAlgorithm | ErrorKind::MissingAlgorithm => {
            TokenError::UnsupportedAlgorithm(err.to_string())
        }
        ErrorKind::InvalidToken | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
            TokenError::Malformed(err.to_string())
        }
        _ => TokenError::Unknown(err.to_string()),
    }
}
