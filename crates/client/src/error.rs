use thiserror::Error;

use orgauth_auth::{AuthzError, KeyError, TokenError};

use crate::header::HeaderError;

/// Failure while building a client: bad configuration or an unsuccessful
/// bootstrap against the auth service.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("invalid auth URL '{url}': {reason}")]
    InvalidAuthUrl { url: String, reason: String },

    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("request for token verification metadata failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("the API key was rejected by the auth service")]
    InvalidApiKey,

    #[error("bad request fetching token verification metadata: {0}")]
    BadRequest(String),

    #[error("token verification metadata not found; check the auth URL")]
    NotFound,

    #[error("unexpected status {status} fetching token verification metadata: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("invalid token verification metadata: {0}")]
    InvalidMetadata(String),

    #[error(transparent)]
    Key(#[from] KeyError),
}

/// Per-request failure. Callers map [`is_unauthenticated`](Self::is_unauthenticated)
/// to 401 and [`is_forbidden`](Self::is_forbidden) to 403.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error(transparent)]
    Header(#[from] HeaderError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Authz(#[from] AuthzError),
}

impl ClientError {
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Header(_) | Self::Token(_))
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Authz(_))
    }
}
