use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{PermissionAuthority, SessionContext};

/// A node of the navigation sidebar.
///
/// `required_role` stays a raw string: it comes from authored configuration
/// and an unrecognised value simply never grants access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NavLink {
    #[schema(example = "Creator Studio")]
    pub label: String,
    #[schema(example = "/studio")]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub requires_auth: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "dataset_creator")]
    pub required_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<NavLink>>,
}

impl NavLink {
    pub fn new(label: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
            icon: None,
            requires_auth: false,
            required_role: None,
            children: None,
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn requiring_auth(mut self) -> Self {
        self.requires_auth = true;
        self
    }

    /// Gate on a role; implies `requires_auth`.
    pub fn requiring_role(mut self, role: impl Into<String>) -> Self {
        self.requires_auth = true;
        self.required_role = Some(role.into());
        self
    }

    pub fn with_children(mut self, children: Vec<NavLink>) -> Self {
        self.children = Some(children);
        self
    }

    /// Depth-first visit of this node and every descendant.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a NavLink)) {
        visit(self);
        for child in self.children.iter().flatten() {
            child.walk(visit);
        }
    }
}

/// Bind a session once and get back a filter to apply per top-level link.
///
/// The filter returns `None` when the link is hidden for the session and a
/// freshly built link otherwise; the input tree is never modified.
pub fn filter_link(
    authority: &PermissionAuthority,
    session: SessionContext,
) -> impl Fn(&NavLink) -> Option<NavLink> + '_ {
    move |link| authorize(authority, &session, link)
}

/// Filter a whole sidebar, keeping the order of surviving links.
pub fn filter_links(
    authority: &PermissionAuthority,
    session: SessionContext,
    links: &[NavLink],
) -> Vec<NavLink> {
    let filter = filter_link(authority, session);
    links.iter().filter_map(|link| filter(link)).collect()
}

fn authorize(
    authority: &PermissionAuthority,
    session: &SessionContext,
    link: &NavLink,
) -> Option<NavLink> {
    if link.requires_auth {
        if !session.is_authenticated {
            tracing::trace!(path = %link.path, "hidden: requires authentication");
            return None;
        }

        if let Some(required) = link.required_role.as_deref() {
            if !authority.has_permission(required, session.role_str()) {
                tracing::trace!(path = %link.path, required = %required, "hidden: role not covered");
                return None;
            }
        }
    }

    match link.children.as_deref() {
        Some(children) if !children.is_empty() => {
            let visible: Vec<NavLink> = children
                .iter()
                .filter_map(|child| authorize(authority, session, child))
                .collect();

            // an auth-gated group with nothing left to show is hidden too
            if visible.is_empty() && link.requires_auth {
                tracing::trace!(path = %link.path, "hidden: no visible children");
                return None;
            }

            Some(NavLink {
                label: link.label.clone(),
                path: link.path.clone(),
                icon: link.icon.clone(),
                requires_auth: link.requires_auth,
                required_role: link.required_role.clone(),
                children: Some(visible),
            })
        }
        _ => Some(link.clone()),
    }
}
