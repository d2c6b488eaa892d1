use super::Role;

/// Authorization view of the caller for one request or render:
/// whether they are signed in and which role, if any, the session carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub is_authenticated: bool,
    pub role: Option<Role>,
}

impl SessionContext {
    pub fn new(is_authenticated: bool, role: Option<Role>) -> Self {
        Self {
            is_authenticated,
            role,
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(role: Role) -> Self {
        Self::new(true, Some(role))
    }

    /// Signed in, but without a role this portal recognises.
    pub fn authenticated_without_role() -> Self {
        Self::new(true, None)
    }

    pub fn role_str(&self) -> Option<&'static str> {
        self.role.map(|role| role.as_str())
    }
}
