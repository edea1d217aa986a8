//! `orgauth-client`: turns an `Authorization` header into an authenticated
//! user and, optionally, an authorization decision for one organization.

pub mod bootstrap;
pub mod client;
pub mod config;
pub mod error;
pub mod header;

pub use client::{AuthClient, UserAndOrgMembership};
pub use config::{AuthUrl, ClientConfig, VerificationInput};
pub use error::{ClientError, InitError};
pub use header::{HeaderError, extract_bearer_token};

pub use orgauth_auth as auth;
