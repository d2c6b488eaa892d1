/// Failures raised by the permission authority.
///
/// Unknown roles passed to permission *checks* are not errors; those fail
/// closed with `false`. These variants cover the cases a caller must handle.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("Cannot determine highest role from empty array")]
    EmptyRoleSet,
    #[error("unknown role: {0}")]
    UnknownRole(String),
    #[error("invalid role hierarchy: {0}")]
    InvalidHierarchy(String),
}
