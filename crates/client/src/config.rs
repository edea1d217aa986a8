//! Client configuration.
//!
//! Either supply the verification input directly or let the client fetch it
//! from the auth service with the API key.

use reqwest::Url;

use crate::error::InitError;

pub const ENV_AUTH_URL: &str = "ORGAUTH_AUTH_URL";
pub const ENV_API_KEY: &str = "ORGAUTH_API_KEY";
pub const ENV_ISSUER: &str = "ORGAUTH_ISSUER";
pub const ENV_VERIFIER_KEY_PEM: &str = "ORGAUTH_VERIFIER_KEY_PEM";

const METADATA_PATH: &str = "/api/v1/token_verification_metadata";

/// Base URL of the auth service: `https`, a host, and nothing after it.
///
/// The text is kept as configured; it is compared verbatim against `iss`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUrl {
    raw: String,
    url: Url,
}

impl AuthUrl {
    pub fn parse(raw: &str) -> Result<Self, InitError> {
        let invalid = |reason: &str| InitError::InvalidAuthUrl {
            url: raw.to_string(),
            reason: reason.to_string(),
        };

        let url = Url::parse(raw).map_err(|e| invalid(&e.to_string()))?;
        if url.scheme() != "https" {
            return Err(invalid("scheme must be https"));
        }
        if url.host_str().is_none_or(str::is_empty) {
            return Err(invalid("missing host"));
        }
        // `Url` normalizes an empty path to "/", so check the raw text too.
        if url.path() != "/" || raw.ends_with('/') {
            return Err(invalid("must not have a path or trailing slash"));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(invalid("must not have a query or fragment"));
        }
        Ok(Self {
            raw: raw.to_string(),
            url,
        })
    }

    /// Expected `iss` claim for tokens minted by this service.
    pub fn issuer(&self) -> &str {
        &self.raw
    }

    pub fn metadata_endpoint(&self) -> Result<Url, InitError> {
        self.url
            .join(METADATA_PATH)
            .map_err(|e| InitError::Config(format!("cannot build metadata URL: {e}")))
    }
}

impl core::fmt::Display for AuthUrl {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Issuer and PEM public key, when known up front.
#[derive(Clone, PartialEq, Eq)]
pub struct VerificationInput {
    pub issuer: String,
    pub verifier_key_pem: String,
}

impl core::fmt::Debug for VerificationInput {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VerificationInput")
            .field("issuer", &self.issuer)
            .field("verifier_key_pem", &format_args!("<{} bytes>", self.verifier_key_pem.len()))
            .finish()
    }
}

#[derive(Clone)]
pub struct ClientConfig {
    pub auth_url: AuthUrl,
    pub api_key: String,
    pub verification: Option<VerificationInput>,
}

impl core::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("auth_url", &self.auth_url)
            .field("api_key", &"<redacted>")
            .field("verification", &self.verification)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(auth_url: &str, api_key: impl Into<String>) -> Result<Self, InitError> {
        Ok(Self {
            auth_url: AuthUrl::parse(auth_url)?,
            api_key: api_key.into(),
            verification: None,
        })
    }

    pub fn with_verification(mut self, input: VerificationInput) -> Self {
        self.verification = Some(input);
        self
    }

    /// Read configuration from `ORGAUTH_*` environment variables.
    pub fn from_env() -> Result<Self, InitError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, InitError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let auth_url = get(ENV_AUTH_URL).ok_or(InitError::MissingEnv(ENV_AUTH_URL))?;
        let api_key = get(ENV_API_KEY).ok_or(InitError::MissingEnv(ENV_API_KEY))?;

        let verification = match (get(ENV_ISSUER), get(ENV_VERIFIER_KEY_PEM)) {
            (Some(issuer), Some(verifier_key_pem)) => Some(VerificationInput {
                issuer,
                verifier_key_pem,
            }),
            (None, None) => None,
            _ => {
                return Err(InitError::Config(format!(
                    "{ENV_ISSUER} and {ENV_VERIFIER_KEY_PEM} must be set together"
                )));
            }
        };

        Ok(Self {
            auth_url: AuthUrl::parse(&auth_url)?,
            api_key,
            verification,
        })
    }
}
