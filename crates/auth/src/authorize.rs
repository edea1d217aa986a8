use thiserror::Error;

use orgauth_core::OrgId;

use crate::claims::AuthenticatedUser;
use crate::membership::OrgMembership;

/// The role condition that was not met.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleRequirement {
    AtLeast(String),
    Exactly(String),
}

impl core::fmt::Display for RoleRequirement {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AtLeast(role) => write!(f, "at least '{role}'"),
            Self::Exactly(role) => write!(f, "exactly '{role}'"),
        }
    }
}

/// Authorization denial for an already-authenticated user.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("user does not have access to any organizations")]
    NoOrgAccess,

    #[error("user does not have access to organization {0}")]
    OrgNotFound(OrgId),

    #[error("user role in organization {org_id} is not {required}")]
    InsufficientRole {
        org_id: OrgId,
        required: RoleRequirement,
    },

    #[error("user is missing permissions {missing:?} in organization {org_id}")]
    InsufficientPermission { org_id: OrgId, missing: Vec<String> },
}

impl AuthzError {
    /// True when the user cannot see the org at all, as opposed to lacking a
    /// role or permission inside it.
    pub fn is_org_access_denial(&self) -> bool {
        matches!(self, Self::NoOrgAccess | Self::OrgNotFound(_))
    }
}

/// Look up the user's membership in `org_id`.
///
/// - No IO
/// - No panics
pub fn validate_access(
    user: &AuthenticatedUser,
    org_id: OrgId,
) -> Result<&OrgMembership, AuthzError> {
    if user.org_id_to_membership.is_empty() {
        return Err(AuthzError::NoOrgAccess);
    }
    user.org_membership(org_id)
        .ok_or(AuthzError::OrgNotFound(org_id))
}

pub fn validate_minimum_role<'a>(
    user: &'a AuthenticatedUser,
    org_id: OrgId,
    minimum_role: &str,
) -> Result<&'a OrgMembership, AuthzError> {
    let membership = validate_access(user, org_id)?;
    if membership.is_at_least_role(minimum_role) {
        Ok(membership)
    } else {
        Err(AuthzError::InsufficientRole {
            org_id,
            required: RoleRequirement::AtLeast(minimum_role.to_string()),
        })
    }
}

pub fn validate_exact_role<'a>(
    user: &'a AuthenticatedUser,
    org_id: OrgId,
    exact_role: &str,
) -> Result<&'a OrgMembership, AuthzError> {
    let membership = validate_access(user, org_id)?;
    if membership.is_role(exact_role) {
        Ok(membership)
    } else {
        Err(AuthzError::InsufficientRole {
            org_id,
            required: RoleRequirement::Exactly(exact_role.to_string()),
        })
    }
}

pub fn validate_permission<'a>(
    user: &'a AuthenticatedUser,
    org_id: OrgId,
    permission: &str,
) -> Result<&'a OrgMembership, AuthzError> {
    validate_all_permissions(user, org_id, [permission])
}

/// Every listed permission must be held; an empty list only checks access.
pub fn validate_all_permissions<'a, I, S>(
    user: &'a AuthenticatedUser,
    org_id: OrgId,
    permissions: I,
) -> Result<&'a OrgMembership, AuthzError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let membership = validate_access(user, org_id)?;
    let missing = membership.missing_permissions(permissions);
    if missing.is_empty() {
        Ok(membership)
    } else {
        Err(AuthzError::InsufficientPermission { org_id, missing })
    }
}
