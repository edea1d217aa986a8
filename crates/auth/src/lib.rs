//! `orgauth-auth`: local access-token verification and org-scoped
//! authorization decisions.
//!
//! This crate is intentionally decoupled from HTTP and storage: verification
//! needs only a public key and the expected issuer.

pub mod authorize;
pub mod claims;
pub mod keys;
pub mod membership;
pub mod verify;

pub use authorize::{
    AuthzError, RoleRequirement, validate_access, validate_all_permissions, validate_exact_role,
    validate_minimum_role, validate_permission,
};
pub use claims::{AuthenticatedUser, LoginMethod, RawUserClaims, reshape_active_org};
pub use keys::{KeyEncoding, KeyError, VerifierKey, load_public_key};
pub use membership::{OrgMembership, OrgRoleStructure};
pub use verify::{RsaTokenVerifier, TokenError, TokenVerifier, VerificationConfig, verify};

pub use orgauth_core::{OrgId, UserId};
