//! Per-organization membership records and the role/permission predicates
//! evaluated against them.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Deserializer, Serialize};

use orgauth_core::OrgId;

/// How roles are modelled inside one organization.
///
/// Unrecognized or `null` values decode as
/// [`OrgRoleStructure::SingleRoleHierarchy`] rather than failing; older tokens
/// omit the field entirely.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<String>")]
pub enum OrgRoleStructure {
    /// One role per user, on a ladder; holding a role implies every role below it.
    #[default]
    #[serde(rename = "single_role_in_hierarchy")]
    SingleRoleHierarchy,

    /// Any number of unordered roles per user.
    #[serde(rename = "multi_role")]
    MultiRole,
}

impl OrgRoleStructure {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SingleRoleHierarchy => "single_role_in_hierarchy",
            Self::MultiRole => "multi_role",
        }
    }
}

impl From<&str> for OrgRoleStructure {
    fn from(value: &str) -> Self {
        match value {
            "single_role_in_hierarchy" => Self::SingleRoleHierarchy,
            "multi_role" => Self::MultiRole,
            other => {
                tracing::warn!(
                    role_structure = other,
                    "unrecognized org role structure, treating as single_role_in_hierarchy"
                );
                Self::SingleRoleHierarchy
            }
        }
    }
}

impl From<String> for OrgRoleStructure {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<Option<String>> for OrgRoleStructure {
    fn from(value: Option<String>) -> Self {
        value.map(Self::from).unwrap_or_default()
    }
}

impl core::fmt::Display for OrgRoleStructure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's membership in one organization, as asserted by the token.
///
/// Exactly one of `inherited_roles_plus_current` / `additional_roles` is
/// meaningful, selected by `role_structure`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgMembership {
    pub org_id: OrgId,
    pub org_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_safe_org_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_metadata: Option<HashMap<String, serde_json::Value>>,

    #[serde(rename = "org_role_structure", default)]
    pub role_structure: OrgRoleStructure,

    #[serde(rename = "user_role", alias = "user_assigned_role")]
    pub assigned_role: String,

    /// The assigned role followed by every role beneath it, most specific first.
    #[serde(
        rename = "inherited_user_roles_plus_current_role",
        alias = "user_inherited_roles_plus_current_role",
        default,
        deserialize_with = "null_as_default"
    )]
    pub inherited_roles_plus_current: Vec<String>,

    #[serde(rename = "additional_roles", default, deserialize_with = "null_as_default")]
    pub additional_roles: HashSet<String>,

    #[serde(rename = "user_permissions", default, deserialize_with = "null_as_default")]
    pub permissions: HashSet<String>,
}

impl OrgMembership {
    pub fn assigned_role(&self) -> &str {
        &self.assigned_role
    }

    /// Exact role check. Hierarchical orgs give no credit for inherited roles.
    pub fn is_role(&self, role: &str) -> bool {
        match self.role_structure {
            OrgRoleStructure::MultiRole => self.holds_flat_role(role),
            OrgRoleStructure::SingleRoleHierarchy => self.assigned_role == role,
        }
    }

    /// "Role or better" check.
    ///
    /// Multi-role orgs have no ladder, so this degenerates to [`Self::is_role`].
    /// Hierarchical orgs test membership in the precomputed closure only.
    pub fn is_at_least_role(&self, role: &str) -> bool {
        match self.role_structure {
            OrgRoleStructure::MultiRole => self.holds_flat_role(role),
            OrgRoleStructure::SingleRoleHierarchy => {
                self.inherited_roles_plus_current.iter().any(|r| r == role)
            }
        }
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    /// True iff every requested permission is held. Vacuously true for no input.
    pub fn has_all_permissions<I, S>(&self, permissions: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        permissions
            .into_iter()
            .all(|p| self.permissions.contains(p.as_ref()))
    }

    /// Requested permissions that are not held, in request order.
    pub fn missing_permissions<I, S>(&self, permissions: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        permissions
            .into_iter()
            .filter(|p| !self.permissions.contains(p.as_ref()))
            .map(|p| p.as_ref().to_string())
            .collect()
    }

    /// Every role the user can act as in this org under the org's role structure.
    pub fn all_roles(&self) -> Vec<&str> {
        match self.role_structure {
            OrgRoleStructure::SingleRoleHierarchy => self
                .inherited_roles_plus_current
                .iter()
                .map(String::as_str)
                .collect(),
            OrgRoleStructure::MultiRole => {
                let mut roles = vec![self.assigned_role.as_str()];
                let mut extra: Vec<&str> = self
                    .additional_roles
                    .iter()
                    .map(String::as_str)
                    .filter(|r| *r != self.assigned_role)
                    .collect();
                extra.sort_unstable();
                roles.extend(extra);
                roles
            }
        }
    }

    fn holds_flat_role(&self, role: &str) -> bool {
        self.assigned_role == role || self.additional_roles.contains(role)
    }
}

/// Decode an explicit `null` the same as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn hierarchy(assigned: &str, closure: &[&str]) -> OrgMembership {
        OrgMembership {
            org_id: OrgId::new_random(),
            org_name: "acme".to_string(),
            url_safe_org_name: None,
            org_metadata: None,
            role_structure: OrgRoleStructure::SingleRoleHierarchy,
            assigned_role: assigned.to_string(),
            inherited_roles_plus_current: closure.iter().map(|r| r.to_string()).collect(),
            additional_roles: HashSet::new(),
            permissions: HashSet::new(),
        }
    }

    fn multi(assigned: &str, additional: &[&str]) -> OrgMembership {
        OrgMembership {
            role_structure: OrgRoleStructure::MultiRole,
            inherited_roles_plus_current: vec![assigned.to_string()],
            additional_roles: additional.iter().map(|r| r.to_string()).collect(),
            ..hierarchy(assigned, &[])
        }
    }

    fn with_permissions(mut m: OrgMembership, perms: &[&str]) -> OrgMembership {
        m.permissions = perms.iter().map(|p| p.to_string()).collect();
        m
    }

    #[test]
    fn hierarchy_at_least_uses_closure() {
        let m = hierarchy("Admin", &["Admin", "Member"]);
        assert!(m.is_at_least_role("Member"));
        assert!(m.is_at_least_role("Admin"));
        assert!(!m.is_at_least_role("Owner"));
    }

    #[test]
    fn hierarchy_is_role_is_exact() {
        let m = hierarchy("Admin", &["Admin", "Member"]);
        assert!(m.is_role("Admin"));
        assert!(!m.is_role("Member"));
        assert!(!m.is_role("Owner"));
    }

    #[test]
    fn hierarchy_ignores_additional_roles() {
        let mut m = hierarchy("Member", &["Member"]);
        m.additional_roles.insert("Owner".to_string());
        assert!(!m.is_role("Owner"));
        assert!(!m.is_at_least_role("Owner"));
    }

    #[test]
    fn multi_role_is_flat() {
        let m = multi("Role A", &["Role B", "Role C"]);
        assert!(m.is_role("Role A"));
        assert!(m.is_role("Role B"));
        assert!(m.is_at_least_role("Role C"));
        assert!(!m.is_at_least_role("Role D"));
        assert!(!m.is_role("Role D"));
    }

    #[test]
    fn permission_checks() {
        let m = with_permissions(hierarchy("Admin", &["Admin"]), &["Read", "Write"]);
        assert!(m.has_permission("Read"));
        assert!(!m.has_permission("Edit"));
        assert!(m.has_all_permissions(["Read", "Write"]));
        assert!(!m.has_all_permissions(["Read", "Write", "Delete"]));
        assert!(m.has_all_permissions(Vec::<String>::new()));
        assert_eq!(m.missing_permissions(["Delete", "Read", "Edit"]), vec!["Delete", "Edit"]);
    }

    #[test]
    fn all_roles_follows_structure() {
        let h = hierarchy("Admin", &["Admin", "Member"]);
        assert_eq!(h.all_roles(), vec!["Admin", "Member"]);

        let m = multi("Role A", &["Role C", "Role B", "Role A"]);
        assert_eq!(m.all_roles(), vec!["Role A", "Role B", "Role C"]);
    }

    #[test]
    fn decodes_current_wire_shape() {
        let org_id = OrgId::new_random();
        let json = serde_json::json!({
            "org_id": org_id,
            "org_name": "acme",
            "url_safe_org_name": "acme",
            "org_role_structure": "multi_role",
            "user_role": "Role A",
            "inherited_user_roles_plus_current_role": ["Role A"],
            "additional_roles": ["Role B"],
            "user_permissions": ["Read"],
        });

        let m: OrgMembership = serde_json::from_value(json).unwrap();
        assert_eq!(m.org_id, org_id);
        assert_eq!(m.role_structure, OrgRoleStructure::MultiRole);
        assert!(m.is_role("Role B"));
        assert!(m.has_permission("Read"));
    }

    #[test]
    fn decodes_legacy_field_names_and_defaults_structure() {
        let json = serde_json::json!({
            "org_id": OrgId::new_random(),
            "org_name": "legacy",
            "user_assigned_role": "Admin",
            "user_inherited_roles_plus_current_role": ["Admin", "Member"],
        });

        let m: OrgMembership = serde_json::from_value(json).unwrap();
        assert_eq!(m.role_structure, OrgRoleStructure::SingleRoleHierarchy);
        assert_eq!(m.assigned_role(), "Admin");
        assert!(m.is_at_least_role("Member"));
        assert!(m.permissions.is_empty());
    }

    #[test]
    fn unknown_role_structure_falls_back_to_hierarchy() {
        let s: OrgRoleStructure = serde_json::from_str("\"role_soup\"").unwrap();
        assert_eq!(s, OrgRoleStructure::SingleRoleHierarchy);
    }

    #[test]
    fn null_collections_and_structure_decode_as_empty() {
        let json = serde_json::json!({
            "org_id": OrgId::new_random(),
            "org_name": "acme",
            "org_role_structure": null,
            "user_role": "Admin",
            "inherited_user_roles_plus_current_role": null,
            "additional_roles": null,
            "user_permissions": null,
        });

        let m: OrgMembership = serde_json::from_value(json).unwrap();
        assert_eq!(m.role_structure, OrgRoleStructure::SingleRoleHierarchy);
        assert!(m.inherited_roles_plus_current.is_empty());
        assert!(m.additional_roles.is_empty());
        assert!(m.permissions.is_empty());
        assert!(m.is_role("Admin"));
        assert!(!m.has_permission("Read"));
    }

    #[test]
    fn role_structure_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&OrgRoleStructure::MultiRole).unwrap(),
            "\"multi_role\""
        );
        assert_eq!(
            serde_json::to_string(&OrgRoleStructure::SingleRoleHierarchy).unwrap(),
            "\"single_role_in_hierarchy\""
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: holding all of a set means holding each member of it.
        #[test]
        fn all_permissions_agrees_with_each(
            held in prop::collection::hash_set("[a-e]", 0..5),
            wanted in prop::collection::vec("[a-e]", 0..5),
        ) {
            let mut m = hierarchy("Admin", &["Admin"]);
            m.permissions = held;
            let each = wanted.iter().all(|p| m.has_permission(p));
            prop_assert_eq!(m.has_all_permissions(&wanted), each);
            prop_assert_eq!(m.missing_permissions(&wanted).is_empty(), each);
        }

        /// Property: without a hierarchy, "at least" and "exactly" coincide.
        #[test]
        fn multi_role_checks_coincide(
            additional in prop::collection::vec("[a-d]", 0..4),
            probe in "[a-e]",
        ) {
            let refs: Vec<&str> = additional.iter().map(String::as_str).collect();
            let m = multi("a", &refs);
            prop_assert_eq!(m.is_role(&probe), m.is_at_least_role(&probe));
        }

        /// Property: an exact hierarchical role is always also "at least" that role
        /// when the closure starts with the assigned role.
        #[test]
        fn hierarchy_exact_implies_at_least(
            below in prop::collection::vec("[a-d]", 0..4),
        ) {
            let mut closure = vec!["z"];
            closure.extend(below.iter().map(String::as_str));
            let m = hierarchy("z", &closure);
            prop_assert!(m.is_role("z"));
            prop_assert!(m.is_at_least_role("z"));
        }
    }
}
