use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HeaderError {
    #[error("authorization header is not in the form 'Bearer <token>'")]
    Malformed,
}

/// Pull the token out of an `Authorization: Bearer <token>` value.
///
/// Exactly one space separates the scheme from the token; the scheme is
/// case-sensitive.
pub fn extract_bearer_token(header: &str) -> Result<&str, HeaderError> {
    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(HeaderError::Malformed),
    }
}
