use std::path::Path;

use crate::authz::{filter_links, NavLink, PermissionAuthority, SessionContext};
use crate::errors::AppError;

const DEFAULT_SIDEBAR: &str = include_str!("../config/navigation.json");

/// The authored sidebar, loaded once at startup and read-only afterwards.
#[derive(Debug, Clone)]
pub struct Navigation {
    links: Vec<NavLink>,
}

impl Navigation {
    pub fn new(links: Vec<NavLink>) -> Self {
        Self { links }
    }

    /// Sidebar shipped with the binary.
    pub fn builtin() -> Result<Self, AppError> {
        Self::from_json(DEFAULT_SIDEBAR)
    }

    /// Use `NAVIGATION_CONFIG` when set, the built-in sidebar otherwise.
    pub fn from_env() -> Result<Self, AppError> {
        match std::env::var("NAVIGATION_CONFIG") {
            Ok(path) if !path.trim().is_empty() => Self::from_path(Path::new(path.trim())),
            _ => Self::builtin(),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            AppError::configuration(format!("failed to read navigation config {}: {err}", path.display()))
        })?;
        tracing::info!(path = %path.display(), "loaded navigation config");
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        let links: Vec<NavLink> = serde_json::from_str(raw)
            .map_err(|err| AppError::configuration(format!("invalid navigation config: {err}")))?;

        let navigation = Self::new(links);
        navigation.warn_unknown_roles();
        Ok(navigation)
    }

    pub fn links(&self) -> &[NavLink] {
        &self.links
    }

    pub fn for_session(&self, authority: &PermissionAuthority, session: SessionContext) -> Vec<NavLink> {
        filter_links(authority, session, &self.links)
    }

    /// Required roles that no session can ever satisfy.
    pub fn unknown_roles(&self, authority: &PermissionAuthority) -> Vec<String> {
        let mut unknown = Vec::new();
        for link in &self.links {
            link.walk(&mut |node| {
                if let Some(role) = node.required_role.as_deref() {
                    if !authority.is_valid_role(role) && !unknown.iter().any(|seen| seen == role) {
                        unknown.push(role.to_string());
                    }
                }
            });
        }
        unknown
    }

    fn warn_unknown_roles(&self) {
        for role in self.unknown_roles(&PermissionAuthority::new()) {
            tracing::warn!(role = %role, "navigation references unknown role; links gated on it stay hidden");
        }
    }
}
