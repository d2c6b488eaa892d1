use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::AuthzError;

/// Identity tokens recognised by the portal.
///
/// Declaration order is significant: it fixes each role's permission bit
/// (`1 << index`) and the order returned by [`Role::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    DatasetCreator,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::User, Role::DatasetCreator, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::DatasetCreator => "dataset_creator",
            Role::Admin => "admin",
        }
    }

    /// Unique permission bit for this role.
    pub fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthzError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .iter()
            .copied()
            .find(|role| role.as_str() == value)
            .ok_or_else(|| AuthzError::UnknownRole(value.to_string()))
    }
}
