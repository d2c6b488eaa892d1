//! Authorization core - role hierarchy and sidebar filtering
//!
//! This module implements:
//! - The closed set of portal roles and their permission bits
//! - The permission authority (bitmask containment checks over the hierarchy)
//! - The session context handed in by the auth layer
//! - The sidebar link authorizer that prunes a navigation tree per session

mod authority;
mod error;
mod role;
mod session;
mod sidebar;

pub use authority::PermissionAuthority;
pub use error::AuthzError;
pub use role::Role;
pub use session::SessionContext;
pub use sidebar::{filter_link, filter_links, NavLink};
