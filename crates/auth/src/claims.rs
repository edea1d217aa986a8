use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orgauth_core::{OrgId, UserId};

use crate::membership::{OrgMembership, null_as_default};

/// How the user authenticated when the token was minted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "login_method", rename_all = "snake_case")]
pub enum LoginMethod {
    Password,
    MagicLink,
    SocialSso {
        provider: String,
    },
    EmailConfirmationLink,
    SamlSso {
        provider: String,
        org_id: OrgId,
    },
    Impersonation,
    GeneratedFromBackendApi,
    /// Absent from the token, or a method this library does not know.
    #[serde(other)]
    Unknown,
}

/// Token payload exactly as the auth server sends it.
///
/// Two shapes exist: the full `org_id_to_org_member_info` map, and an
/// "active org" shape carrying a single `org_member_info`. Use
/// [`reshape_active_org`] to normalize either into an [`AuthenticatedUser`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawUserClaims {
    pub user_id: UserId,

    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub legacy_user_id: Option<String>,
    #[serde(default)]
    pub impersonator_user_id: Option<UserId>,

    #[serde(default)]
    pub properties: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, serde_json::Value>>,

    #[serde(default)]
    pub login_method: Option<LoginMethod>,

    #[serde(default)]
    pub active_org_id: Option<OrgId>,
    #[serde(rename = "org_id_to_org_member_info", default)]
    pub org_id_to_membership: Option<HashMap<OrgId, OrgMembership>>,
    #[serde(rename = "org_member_info", default)]
    pub active_org_membership: Option<OrgMembership>,

    #[serde(rename = "iss", default)]
    pub issuer: String,
    #[serde(rename = "iat", default, with = "chrono::serde::ts_seconds_option")]
    pub issued_at: Option<DateTime<Utc>>,
    #[serde(rename = "nbf", default, with = "chrono::serde::ts_seconds_option")]
    pub not_before: Option<DateTime<Utc>>,
    #[serde(rename = "exp", default, with = "chrono::serde::ts_seconds_option")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// A verified caller. Built fresh for every successful verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub legacy_user_id: Option<String>,
    pub impersonator_user_id: Option<UserId>,
    pub properties: HashMap<String, serde_json::Value>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub login_method: LoginMethod,
    pub active_org_id: Option<OrgId>,
    #[serde(rename = "org_id_to_org_member_info")]
    pub org_id_to_membership: HashMap<OrgId, OrgMembership>,
    #[serde(rename = "iss")]
    pub issuer: String,
    #[serde(rename = "iat", with = "chrono::serde::ts_seconds_option")]
    pub issued_at: Option<DateTime<Utc>>,
    #[serde(rename = "nbf", with = "chrono::serde::ts_seconds_option")]
    pub not_before: Option<DateTime<Utc>>,
    #[serde(rename = "exp", with = "chrono::serde::ts_seconds")]
    pub expires_at: DateTime<Utc>,
}

impl AuthenticatedUser {
    pub fn org_membership(&self, org_id: OrgId) -> Option<&OrgMembership> {
        self.org_id_to_membership.get(&org_id)
    }

    /// Membership for the token's active org, when the token is org-scoped.
    pub fn active_org(&self) -> Option<&OrgMembership> {
        self.active_org_id.and_then(|id| self.org_membership(id))
    }

    /// Org ids the user belongs to, sorted for stable output.
    pub fn org_ids(&self) -> Vec<OrgId> {
        let mut ids: Vec<OrgId> = self.org_id_to_membership.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn user_property(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.get(key)
    }

    pub fn is_impersonated(&self) -> bool {
        self.impersonator_user_id.is_some()
    }
}

/// Normalize a raw payload into an [`AuthenticatedUser`].
///
/// A singular `org_member_info` replaces the map with one entry keyed by its
/// org id and becomes the active org. A missing login method becomes
/// [`LoginMethod::Unknown`]. The caller must already have checked that `exp`
/// is present; a missing one is mapped to the Unix epoch.
pub fn reshape_active_org(raw: RawUserClaims) -> AuthenticatedUser {
    let (active_org_id, org_id_to_membership) = match raw.active_org_membership {
        Some(membership) => {
            let org_id = membership.org_id;
            (Some(org_id), HashMap::from([(org_id, membership)]))
        }
        None => (raw.active_org_id, raw.org_id_to_membership.unwrap_or_default()),
    };

    AuthenticatedUser {
        user_id: raw.user_id,
        email: raw.email,
        first_name: raw.first_name,
        last_name: raw.last_name,
        username: raw.username,
        legacy_user_id: raw.legacy_user_id,
        impersonator_user_id: raw.impersonator_user_id,
        properties: raw.properties.unwrap_or_default(),
        metadata: raw.metadata.unwrap_or_default(),
        login_method: raw.login_method.unwrap_or(LoginMethod::Unknown),
        active_org_id,
        org_id_to_membership,
        issuer: raw.issuer,
        issued_at: raw.issued_at,
        not_before: raw.not_before,
        expires_at: raw.expires_at.unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::OrgRoleStructure;
    use std::collections::HashSet;

    fn membership(org_id: OrgId) -> OrgMembership {
        OrgMembership {
            org_id,
            org_name: "acme".to_string(),
            url_safe_org_name: None,
            org_metadata: None,
            role_structure: OrgRoleStructure::SingleRoleHierarchy,
            assigned_role: "Admin".to_string(),
            inherited_roles_plus_current: vec!["Admin".to_string(), "Member".to_string()],
            additional_roles: HashSet::new(),
            permissions: HashSet::new(),
        }
    }

    fn raw(user_id: UserId) -> RawUserClaims {
        RawUserClaims {
            user_id,
            email: "ada@example.com".to_string(),
            first_name: None,
            last_name: None,
            username: None,
            legacy_user_id: None,
            impersonator_user_id: None,
            properties: None,
            metadata: None,
            login_method: None,
            active_org_id: None,
            org_id_to_membership: None,
            active_org_membership: None,
            issuer: "https://auth.example.com".to_string(),
            issued_at: None,
            not_before: None,
            expires_at: DateTime::from_timestamp(2_000_000_000, 0),
        }
    }

    #[test]
    fn singular_membership_becomes_active_org() {
        let org_id = OrgId::new_random();
        let mut claims = raw(UserId::new_random());
        claims.org_id_to_membership = Some(HashMap::from([(
            OrgId::new_random(),
            membership(OrgId::new_random()),
        )]));
        claims.active_org_membership = Some(membership(org_id));

        let user = reshape_active_org(claims);
        assert_eq!(user.active_org_id, Some(org_id));
        assert_eq!(user.org_ids(), vec![org_id]);
        assert_eq!(user.active_org().map(|m| m.org_id), Some(org_id));
    }

    #[test]
    fn full_map_passes_through() {
        let a = OrgId::new_random();
        let b = OrgId::new_random();
        let mut claims = raw(UserId::new_random());
        claims.org_id_to_membership = Some(HashMap::from([(a, membership(a)), (b, membership(b))]));

        let user = reshape_active_org(claims);
        assert_eq!(user.active_org_id, None);
        assert!(user.active_org().is_none());
        assert_eq!(user.org_id_to_membership.len(), 2);
        assert!(user.org_membership(a).is_some());
    }

    #[test]
    fn missing_login_method_becomes_unknown() {
        let user = reshape_active_org(raw(UserId::new_random()));
        assert_eq!(user.login_method, LoginMethod::Unknown);
        assert!(user.org_id_to_membership.is_empty());
    }

    #[test]
    fn login_method_decodes_tagged_and_unknown() {
        let sso: LoginMethod = serde_json::from_value(serde_json::json!({
            "login_method": "social_sso",
            "provider": "Google",
        }))
        .unwrap();
        assert_eq!(sso, LoginMethod::SocialSso { provider: "Google".to_string() });

        let novel: LoginMethod =
            serde_json::from_value(serde_json::json!({ "login_method": "passkey" })).unwrap();
        assert_eq!(novel, LoginMethod::Unknown);
    }

    #[test]
    fn null_optional_claims_decode_as_absent() {
        let json = serde_json::json!({
            "user_id": UserId::new_random(),
            "email": null,
            "first_name": null,
            "properties": null,
            "login_method": null,
            "org_id_to_org_member_info": null,
            "org_member_info": null,
            "iss": "https://auth.example.com",
            "exp": 1_700_003_600,
        });

        let user = reshape_active_org(serde_json::from_value(json).unwrap());
        assert_eq!(user.email, "");
        assert_eq!(user.first_name, None);
        assert!(user.properties.is_empty());
        assert_eq!(user.login_method, LoginMethod::Unknown);
        assert!(user.org_id_to_membership.is_empty());
    }

    #[test]
    fn raw_claims_decode_active_org_shape() {
        let org_id = OrgId::new_random();
        let user_id = UserId::new_random();
        let json = serde_json::json!({
            "user_id": user_id,
            "email": "ada@example.com",
            "org_member_info": {
                "org_id": org_id,
                "org_name": "acme",
                "user_role": "Owner",
                "inherited_user_roles_plus_current_role": ["Owner", "Admin"],
            },
            "login_method": { "login_method": "password" },
            "properties": { "plan": "pro" },
            "iss": "https://auth.example.com",
            "iat": 1_700_000_000,
            "exp": 1_700_003_600,
        });

        let raw: RawUserClaims = serde_json::from_value(json).unwrap();
        let user = reshape_active_org(raw);
        assert_eq!(user.user_id, user_id);
        assert_eq!(user.active_org_id, Some(org_id));
        assert_eq!(user.login_method, LoginMethod::Password);
        assert_eq!(user.user_property("plan"), Some(&serde_json::json!("pro")));
        assert_eq!(user.expires_at.timestamp(), 1_700_003_600);
        assert!(!user.is_impersonated());
    }
}
