use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use orgauth_auth::{
    AuthenticatedUser, AuthzError, OrgId, OrgMembership, RsaTokenVerifier, TokenVerifier,
    VerificationConfig, validate_access, validate_all_permissions, validate_exact_role,
    validate_minimum_role, validate_permission,
};

use crate::bootstrap::fetch_verification_config;
use crate::config::{ClientConfig, VerificationInput};
use crate::error::{ClientError, InitError};
use crate::header::extract_bearer_token;

/// A verified user together with their membership in the requested org.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserAndOrgMembership {
    pub user: AuthenticatedUser,
    pub membership: OrgMembership,
}

/// Header-in, decision-out entry point.
///
/// Cheap to clone; holds no per-request state.
#[derive(Clone)]
pub struct AuthClient {
    verifier: Arc<dyn TokenVerifier>,
}

impl AuthClient {
    pub fn new(config: VerificationConfig) -> Self {
        Self::with_verifier(Arc::new(RsaTokenVerifier::new(config)))
    }

    pub fn with_verifier(verifier: Arc<dyn TokenVerifier>) -> Self {
        Self { verifier }
    }

    pub fn from_verification_input(input: &VerificationInput) -> Result<Self, InitError> {
        let config = VerificationConfig::from_pem(input.issuer.clone(), &input.verifier_key_pem)?;
        Ok(Self::new(config))
    }

    /// Build from configuration, contacting the auth service only when no
    /// verification input was supplied.
    pub async fn init(config: &ClientConfig) -> Result<Self, InitError> {
        match &config.verification {
            Some(input) => Self::from_verification_input(input),
            None => {
                let http = reqwest::Client::new();
                let verification =
                    fetch_verification_config(&http, &config.auth_url, &config.api_key).await?;
                Ok(Self::new(verification))
            }
        }
    }

    pub fn get_user(&self, authorization_header: &str) -> Result<AuthenticatedUser, ClientError> {
        self.get_user_at(authorization_header, Utc::now())
    }

    /// [`get_user`](Self::get_user) against an explicit clock.
    pub fn get_user_at(
        &self,
        authorization_header: &str,
        now: DateTime<Utc>,
    ) -> Result<AuthenticatedUser, ClientError> {
        let token = extract_bearer_token(authorization_header).inspect_err(|_| {
            tracing::debug!("rejected malformed authorization header");
        })?;
        Ok(self.verifier.verify(token, now)?)
    }

    pub fn get_user_with_org(
        &self,
        authorization_header: &str,
        org_id: OrgId,
    ) -> Result<UserAndOrgMembership, ClientError> {
        self.user_in_org(authorization_header, |user| validate_access(user, org_id))
    }

    pub fn get_user_with_org_by_minimum_role(
        &self,
        authorization_header: &str,
        org_id: OrgId,
        minimum_role: &str,
    ) -> Result<UserAndOrgMembership, ClientError> {
        self.user_in_org(authorization_header, |user| {
            validate_minimum_role(user, org_id, minimum_role)
        })
    }

    pub fn get_user_with_org_by_exact_role(
        &self,
        authorization_header: &str,
        org_id: OrgId,
        exact_role: &str,
    ) -> Result<UserAndOrgMembership, ClientError> {
        self.user_in_org(authorization_header, |user| {
            validate_exact_role(user, org_id, exact_role)
        })
    }

    pub fn get_user_with_org_by_permission(
        &self,
        authorization_header: &str,
        org_id: OrgId,
        permission: &str,
    ) -> Result<UserAndOrgMembership, ClientError> {
        self.user_in_org(authorization_header, |user| {
            validate_permission(user, org_id, permission)
        })
    }

    pub fn get_user_with_org_by_all_permissions(
        &self,
        authorization_header: &str,
        org_id: OrgId,
        permissions: &[&str],
    ) -> Result<UserAndOrgMembership, ClientError> {
        self.user_in_org(authorization_header, |user| {
            validate_all_permissions(user, org_id, permissions.iter().copied())
        })
    }

    fn user_in_org<F>(
        &self,
        authorization_header: &str,
        check: F,
    ) -> Result<UserAndOrgMembership, ClientError>
    where
        F: for<'u> FnOnce(&'u AuthenticatedUser) -> Result<&'u OrgMembership, AuthzError>,
    {
        let user = self.get_user(authorization_header)?;
        let membership = check(&user)
            .inspect_err(|err| tracing::debug!(user_id = %user.user_id, %err, "access denied"))?
            .clone();
        Ok(UserAndOrgMembership { user, membership })
    }
}
