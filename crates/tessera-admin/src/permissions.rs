//! Permission bit-set and role floors

use serde::{Deserialize, Serialize};
use std::fmt;
use tessera_core::{Permission, Role};

/// Set of permissions packed into one byte
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionSet(u8);

impl PermissionSet {
    /// Empty set
    pub const EMPTY: Self = Self(0);

    /// Build from a list of permissions
    pub fn of(perms: &[Permission]) -> Self {
        perms.iter().fold(Self::EMPTY, |set, p| set.with(*p))
    }

    /// Default permissions implied by a role
    pub fn floor(role: Role) -> Self {
        match role {
            Role::User => Self::of(&[Permission::ViewDashboard]),
            Role::Admin => Self::of(&[
                Permission::ViewDashboard,
                Permission::ManageUsers,
                Permission::ExecuteFunctions,
                Permission::ManageParams,
            ]),
            Role::SuperAdmin => Self::of(&Permission::ALL),
        }
    }

    /// Whether `perm` may be held at all by `role`
    pub fn allowed_for(role: Role, perm: Permission) -> bool {
        perm != Permission::ManageAdmins || role >= Role::Admin
    }

    pub fn contains(&self, perm: Permission) -> bool {
        self.0 & perm.bit() != 0
    }

    /// Copy with `perm` added
    pub fn with(self, perm: Permission) -> Self {
        Self(self.0 | perm.bit())
    }

    /// Copy with `perm` removed
    pub fn without(self, perm: Permission) -> Self {
        Self(self.0 & !perm.bit())
    }

    /// True if every permission in `other` is also in `self`
    pub fn is_superset_of(&self, other: PermissionSet) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        Permission::ALL.into_iter().filter(|p| self.contains(*p))
    }

    /// Raw bitmap
    pub fn bits(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(|p| p.name()).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floors_are_nested() {
        let user = PermissionSet::floor(Role::User);
        let admin = PermissionSet::floor(Role::Admin);
        let sup = PermissionSet::floor(Role::SuperAdmin);

        assert!(admin.is_superset_of(user));
        assert!(sup.is_superset_of(admin));
        assert!(!admin.contains(Permission::ManageAdmins));
        assert!(sup.contains(Permission::ManageAdmins));
    }

    #[test]
    fn test_manage_admins_requires_admin_role() {
        assert!(!PermissionSet::allowed_for(Role::User, Permission::ManageAdmins));
        assert!(PermissionSet::allowed_for(Role::Admin, Permission::ManageAdmins));
        assert!(PermissionSet::allowed_for(Role::User, Permission::ManageParams));
    }

    #[test]
    fn test_with_without() {
        let set = PermissionSet::EMPTY
            .with(Permission::ManageParams)
            .with(Permission::ViewDashboard)
            .without(Permission::ViewDashboard);
        assert!(set.contains(Permission::ManageParams));
        assert!(!set.contains(Permission::ViewDashboard));
        assert_eq!(set.to_string(), "[manage_params]");
    }
}
