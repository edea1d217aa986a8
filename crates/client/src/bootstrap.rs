//! Fetch verification material from the auth service.

use reqwest::{StatusCode, Url};
use serde::Deserialize;

use orgauth_auth::VerificationConfig;

use crate::config::AuthUrl;
use crate::error::InitError;

#[derive(Debug, Deserialize)]
struct TokenVerificationMetadata {
    verifier_key_pem: String,
}

/// Fetch the verifier key and pair it with the auth URL as issuer.
pub async fn fetch_verification_config(
    http: &reqwest::Client,
    auth_url: &AuthUrl,
    api_key: &str,
) -> Result<VerificationConfig, InitError> {
    let endpoint = auth_url.metadata_endpoint()?;
    let verifier_key_pem = fetch_verifier_key_pem(http, endpoint, api_key).await?;
    let config = VerificationConfig::from_pem(auth_url.issuer(), &verifier_key_pem)?;

    tracing::info!(issuer = %auth_url, "fetched token verification metadata");
    Ok(config)
}

/// GET the metadata endpoint with the API key as bearer credential.
pub async fn fetch_verifier_key_pem(
    http: &reqwest::Client,
    endpoint: Url,
    api_key: &str,
) -> Result<String, InitError> {
    let response = http.get(endpoint).bearer_auth(api_key).send().await?;

    let status = response.status();
    match status {
        StatusCode::OK => {
            let metadata: TokenVerificationMetadata = response
                .json()
                .await
                .map_err(|e| InitError::InvalidMetadata(e.to_string()))?;
            Ok(metadata.verifier_key_pem)
        }
        StatusCode::UNAUTHORIZED => Err(InitError::InvalidApiKey),
        StatusCode::BAD_REQUEST => Err(InitError::BadRequest(response.text().await?)),
        StatusCode::NOT_FOUND => Err(InitError::NotFound),
        _ => {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "unexpected metadata response");
            Err(InitError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            })
        }
    }
}
