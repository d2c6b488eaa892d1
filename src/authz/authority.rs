use std::collections::BTreeMap;

use super::{AuthzError, Role};

/// Role hierarchy encoded as bit flags.
///
/// Each role owns one permission bit ([`Role::bit`]). The hierarchy table
/// lists, per role, the permission values its authority includes; the OR of
/// that list is the mask a session carrying the role actually holds.
///
/// Build one at startup and share it by reference (the app state keeps it in
/// an `Arc`). The table is never mutated after construction.
#[derive(Debug, Clone)]
pub struct PermissionAuthority {
    hierarchy: BTreeMap<Role, Vec<u32>>,
}

impl Default for PermissionAuthority {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionAuthority {
    /// Authority with the portal's built-in hierarchy:
    /// `admin` > `dataset_creator` > `user`.
    pub fn new() -> Self {
        let hierarchy = BTreeMap::from([
            (
                Role::Admin,
                vec![Role::Admin.bit(), Role::User.bit(), Role::DatasetCreator.bit()],
            ),
            (Role::DatasetCreator, vec![Role::DatasetCreator.bit(), Role::User.bit()]),
            (Role::User, vec![Role::User.bit()]),
        ]);

        Self { hierarchy }
    }

    /// Authority over a custom hierarchy table, rejected if inconsistent.
    pub fn with_hierarchy(hierarchy: BTreeMap<Role, Vec<u32>>) -> Result<Self, AuthzError> {
        let authority = Self { hierarchy };
        authority.validate()?;
        Ok(authority)
    }

    /// Check the hand-authored table: every role present, every entry holds
    /// its own bit and only known bits, no entry holds the bit of a more
    /// senior role, and each role covers all the authority of every role with
    /// a lower permission value.
    pub fn validate(&self) -> Result<(), AuthzError> {
        let known = Role::ALL.iter().fold(0u32, |mask, role| mask | role.bit());

        for role in Role::ALL {
            let entry = self.hierarchy.get(&role).ok_or_else(|| {
                AuthzError::InvalidHierarchy(format!("no hierarchy entry for {role}"))
            })?;

            if !entry.contains(&role.bit()) {
                return Err(AuthzError::InvalidHierarchy(format!(
                    "{role} does not include its own permission"
                )));
            }

            if let Some(stray) = entry.iter().find(|&&value| value == 0 || value & known != value) {
                return Err(AuthzError::InvalidHierarchy(format!(
                    "{role} references unknown permission value {stray}"
                )));
            }

            if let Some(senior) = Role::ALL
                .iter()
                .find(|senior| senior.bit() > role.bit() && entry.contains(&senior.bit()))
            {
                return Err(AuthzError::InvalidHierarchy(format!(
                    "{role} must not hold the authority of {senior}"
                )));
            }
        }

        for senior in Role::ALL {
            for junior in Role::ALL.iter().copied().filter(|r| r.bit() < senior.bit()) {
                let covered = self.combined_authority(junior);
                if self.combined_authority(senior) & covered != covered {
                    return Err(AuthzError::InvalidHierarchy(format!(
                        "{senior} does not cover the authority of {junior}"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Unknown role strings never reach this; they are rejected by
    /// `Role::from_str` / [`is_valid_role`](Self::is_valid_role) first.
    pub fn permission_value_of(&self, role: Role) -> u32 {
        role.bit()
    }

    pub fn hierarchy_of(&self, role: Role) -> &[u32] {
        self.hierarchy.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn combined_authority(&self, role: Role) -> u32 {
        self.hierarchy_of(role).iter().fold(0, |mask, value| mask | value)
    }

    /// Typed containment test: does `actual`'s combined authority hold the
    /// bit of `required`.
    pub fn covers(&self, required: Role, actual: Role) -> bool {
        let needed = self.permission_value_of(required);
        self.combined_authority(actual) & needed == needed
    }

    /// The single authorization primitive over untrusted role strings.
    ///
    /// Fails closed: an unknown `required` role, a missing `actual` role or an
    /// unknown `actual` role all yield `false`.
    pub fn has_permission(&self, required: &str, actual: Option<&str>) -> bool {
        let Some(required_role) = self.resolve(required) else {
            tracing::debug!(required = %required, "unknown required role");
            return false;
        };
        let Some(actual_role) = actual.and_then(|role| self.resolve(role)) else {
            return false;
        };

        let allowed = self.covers(required_role, actual_role);
        tracing::debug!(
            required = %required_role,
            role = %actual_role,
            allowed,
            "permission check"
        );
        allowed
    }

    pub fn has_any_permission<I, S>(&self, required: I, actual: Option<&str>) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        required
            .into_iter()
            .any(|role| self.has_permission(role.as_ref(), actual))
    }

    /// Same outcome as [`has_any_permission`](Self::has_any_permission);
    /// validates each candidate before checking it.
    pub fn can_any_role<I, S>(&self, roles: I, actual: Option<&str>) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        roles.into_iter().any(|role| {
            let role = role.as_ref();
            self.is_valid_role(role) && self.has_permission(role, actual)
        })
    }

    /// True when at least one valid role in `roles` is *not* covered by
    /// `actual`.
    pub fn cannot_any_role<I, S>(&self, roles: I, actual: Option<&str>) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        roles.into_iter().any(|role| {
            let role = role.as_ref();
            self.is_valid_role(role) && !self.has_permission(role, actual)
        })
    }

    /// Most senior role in `roles`. An empty slice is a caller bug and
    /// returns [`AuthzError::EmptyRoleSet`].
    pub fn get_highest_role(&self, roles: &[Role]) -> Result<Role, AuthzError> {
        roles
            .iter()
            .copied()
            .max_by_key(|role| self.permission_value_of(*role))
            .ok_or(AuthzError::EmptyRoleSet)
    }

    pub fn is_valid_role(&self, candidate: &str) -> bool {
        self.resolve(candidate).is_some()
    }

    pub fn get_all_role_types(&self) -> Vec<Role> {
        Role::ALL.to_vec()
    }

    /// Owned copy of the hierarchy table.
    pub fn get_all_permissions(&self) -> BTreeMap<Role, Vec<u32>> {
        self.hierarchy.clone()
    }

    fn resolve(&self, candidate: &str) -> Option<Role> {
        candidate
            .parse::<Role>()
            .ok()
            .filter(|role| self.hierarchy.contains_key(role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authority() -> PermissionAuthority {
        PermissionAuthority::new()
    }

    #[test]
    fn builtin_hierarchy_is_consistent() {
        assert_eq!(authority().validate(), Ok(()));
    }

    #[test]
    fn every_role_has_permission_for_itself() {
        let authority = authority();
        for role in Role::ALL {
            assert!(
                authority.has_permission(role.as_str(), Some(role.as_str())),
                "{role} should have its own permission"
            );
        }
    }

    #[test]
    fn senior_roles_cover_junior_roles() {
        let authority = authority();
        assert!(authority.has_permission("user", Some("admin")));
        assert!(authority.has_permission("dataset_creator", Some("admin")));
        assert!(authority.has_permission("user", Some("dataset_creator")));
    }

    #[test]
    fn junior_roles_do_not_cover_senior_roles() {
        let authority = authority();
        assert!(!authority.has_permission("admin", Some("user")));
        assert!(!authority.has_permission("dataset_creator", Some("user")));
        assert!(!authority.has_permission("admin", Some("dataset_creator")));
    }

    #[test]
    fn missing_or_unknown_actual_role_is_denied() {
        let authority = authority();
        for role in Role::ALL {
            assert!(!authority.has_permission(role.as_str(), None));
            assert!(!authority.has_permission(role.as_str(), Some("superadmin")));
            assert!(!authority.has_permission(role.as_str(), Some("")));
        }
    }

    #[test]
    fn unknown_required_role_is_denied_even_for_admin() {
        let authority = authority();
        assert!(!authority.has_permission("superadmin", Some("admin")));
        assert!(!authority.has_permission("Admin", Some("admin")));
    }

    #[test]
    fn combined_authority_ors_hierarchy() {
        let authority = authority();
        assert_eq!(authority.combined_authority(Role::User), 0b001);
        assert_eq!(authority.combined_authority(Role::DatasetCreator), 0b011);
        assert_eq!(authority.combined_authority(Role::Admin), 0b111);
        assert_eq!(authority.hierarchy_of(Role::Admin), &[4, 1, 2]);
    }

    #[test]
    fn any_permission_checks() {
        let authority = authority();
        assert!(authority.has_any_permission(["admin", "user"], Some("user")));
        assert!(!authority.has_any_permission(["admin", "dataset_creator"], Some("user")));
        assert!(!authority.has_any_permission(Vec::<String>::new(), Some("admin")));

        assert!(authority.can_any_role(["bogus", "dataset_creator"], Some("admin")));
        assert!(!authority.can_any_role(["bogus"], Some("admin")));
        assert!(!authority.can_any_role(["admin"], None));
    }

    #[test]
    fn cannot_any_role_detects_a_missing_permission() {
        let authority = authority();
        assert!(authority.cannot_any_role(["user", "admin"], Some("dataset_creator")));
        assert!(!authority.cannot_any_role(["user", "dataset_creator"], Some("dataset_creator")));
        // unknown candidates are skipped rather than counted as missing
        assert!(!authority.cannot_any_role(["superadmin"], Some("user")));
        assert!(authority.cannot_any_role(["user"], None));
    }

    #[test]
    fn highest_role_picks_most_senior() {
        let authority = authority();
        assert_eq!(
            authority.get_highest_role(&[Role::User, Role::DatasetCreator, Role::Admin]),
            Ok(Role::Admin)
        );
        assert_eq!(
            authority.get_highest_role(&[Role::DatasetCreator, Role::Admin]),
            Ok(Role::Admin)
        );
        assert_eq!(authority.get_highest_role(&[Role::User]), Ok(Role::User));
    }

    #[test]
    fn highest_role_of_empty_slice_is_an_error() {
        let err = authority().get_highest_role(&[]).unwrap_err();
        assert_eq!(err, AuthzError::EmptyRoleSet);
        assert_eq!(err.to_string(), "Cannot determine highest role from empty array");
    }

    #[test]
    fn role_validation() {
        let authority = authority();
        assert!(authority.is_valid_role("admin"));
        assert!(authority.is_valid_role("user"));
        assert!(authority.is_valid_role("dataset_creator"));
        assert!(!authority.is_valid_role("superadmin"));
    }

    #[test]
    fn enumerates_roles_in_declaration_order() {
        let roles = authority().get_all_role_types();
        assert_eq!(roles.len(), 3);
        assert_eq!(roles, vec![Role::User, Role::DatasetCreator, Role::Admin]);
    }

    #[test]
    fn permissions_snapshot_is_a_copy() {
        let authority = authority();
        let mut snapshot = authority.get_all_permissions();
        snapshot.insert(Role::User, vec![1, 2, 4]);

        assert_eq!(authority.hierarchy_of(Role::User), &[1]);
        assert!(!authority.has_permission("admin", Some("user")));
    }

    #[test]
    fn rejects_entry_missing_own_bit() {
        let mut table = authority().get_all_permissions();
        table.insert(Role::DatasetCreator, vec![Role::User.bit()]);

        let err = PermissionAuthority::with_hierarchy(table).unwrap_err();
        assert!(matches!(err, AuthzError::InvalidHierarchy(_)));
    }

    #[test]
    fn rejects_senior_role_not_covering_junior() {
        let mut table = authority().get_all_permissions();
        table.insert(Role::Admin, vec![Role::Admin.bit(), Role::User.bit()]);

        let err = PermissionAuthority::with_hierarchy(table).unwrap_err();
        assert_eq!(
            err,
            AuthzError::InvalidHierarchy("admin does not cover the authority of dataset_creator".into())
        );
    }

    #[test]
    fn rejects_junior_role_holding_senior_bit() {
        let mut table = authority().get_all_permissions();
        table.insert(
            Role::DatasetCreator,
            vec![Role::DatasetCreator.bit(), Role::User.bit(), Role::Admin.bit()],
        );

        let err = PermissionAuthority::with_hierarchy(table).unwrap_err();
        assert_eq!(
            err,
            AuthzError::InvalidHierarchy("dataset_creator must not hold the authority of admin".into())
        );
    }

    #[test]
    fn rejects_unknown_permission_values() {
        let mut table = authority().get_all_permissions();
        table.insert(Role::User, vec![Role::User.bit(), 1 << 7]);

        assert!(PermissionAuthority::with_hierarchy(table).is_err());
    }
}
