use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::authz::{NavLink, PermissionAuthority, Role};

// =============================================================================
// ROLE TABLE
// =============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct RoleOverview {
    /// Roles in declaration order (least to most senior)
    pub roles: Vec<Role>,
    /// Permission bit of each role
    #[schema(example = json!({"user": 1, "dataset_creator": 2, "admin": 4}))]
    pub values: BTreeMap<String, u32>,
    /// Permission values each role's authority includes
    #[schema(example = json!({"user": [1], "dataset_creator": [2, 1], "admin": [4, 1, 2]}))]
    pub hierarchy: BTreeMap<String, Vec<u32>>,
    /// OR of each role's hierarchy entry
    pub combined: BTreeMap<String, u32>,
}

impl RoleOverview {
    pub fn from_authority(authority: &PermissionAuthority) -> Self {
        let roles = authority.get_all_role_types();
        let values = roles
            .iter()
            .map(|role| (role.to_string(), authority.permission_value_of(*role)))
            .collect();
        let combined = roles
            .iter()
            .map(|role| (role.to_string(), authority.combined_authority(*role)))
            .collect();
        let hierarchy = authority
            .get_all_permissions()
            .into_iter()
            .map(|(role, bits)| (role.to_string(), bits))
            .collect();

        Self {
            roles,
            values,
            hierarchy,
            combined,
        }
    }
}

// =============================================================================
// PERMISSION CHECK
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CheckMode {
    /// Every required role must be covered
    #[default]
    All,
    /// At least one required role must be covered
    Any,
    /// Like `any`, skipping unrecognised candidates first
    CanAny,
    /// At least one recognised required role is *not* covered
    CannotAny,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PermissionCheckRequest {
    #[schema(example = json!(["dataset_creator"]))]
    pub required_roles: Vec<String>,
    /// Role to test; `null` checks an anonymous or role-less session
    #[schema(example = "admin")]
    pub role: Option<String>,
    #[serde(default)]
    pub mode: CheckMode,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PermissionCheckResponse {
    pub allowed: bool,
    /// Whether `role` is a recognised role at all
    pub role_valid: bool,
    pub mode: CheckMode,
}

// =============================================================================
// HIGHEST ROLE
// =============================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct HighestRoleRequest {
    #[schema(example = json!(["user", "dataset_creator"]))]
    pub roles: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HighestRoleResponse {
    pub role: Role,
}

// =============================================================================
// NAVIGATION
// =============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct NavigationResponse {
    pub authenticated: bool,
    pub role: Option<Role>,
    pub links: Vec<NavLink>,
}
