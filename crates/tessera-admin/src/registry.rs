//! Admin registry
//!
//! Every mutating method checks the caller first, then the target, then
//! mutates. Permission checks are plain predicates over the map.

use crate::permissions::PermissionSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tessera_core::prelude::*;
use tessera_core::{ParameterChange, Permission, Role};

/// Registered admin identity
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminUser {
    pub address: Address,
    pub role: Role,
    pub permissions: PermissionSet,
    pub added_at: Timestamp,
    /// Who registered this admin (self for the bootstrap admin)
    pub added_by: Address,
}

impl AdminUser {
    pub fn has(&self, perm: Permission) -> bool {
        self.permissions.contains(perm)
    }
}

/// Registry of admins keyed by address
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AdminRegistry {
    admins: BTreeMap<Address, AdminUser>,

    /// Set once the bootstrap registration has happened
    #[serde(default)]
    bootstrapped: bool,
}

impl AdminRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an admin
    ///
    /// While the registry has never held anyone, the deployer may register
    /// itself once without holding `ManageAdmins`.
    pub fn add_admin(
        &mut self,
        caller: Address,
        address: Address,
        role: Role,
        now: Timestamp,
        sink: &mut dyn EventSink,
    ) -> Result<()> {
        if self.can_bootstrap() {
            if caller != address {
                return Err(PoolError::PermissionDenied(
                    "bootstrap admin must register itself".into(),
                ));
            }
            tracing::info!(%address, %role, "bootstrap admin registered");
        } else {
            let granter = self.require(&caller, Permission::ManageAdmins)?;
            if role > granter.role {
                return Err(PoolError::PermissionDenied(format!(
                    "{} cannot create a {}",
                    granter.role, role
                )));
            }
            if self.admins.contains_key(&address) {
                return Err(PoolError::DuplicateAdmin(address.to_hex()));
            }
            tracing::info!(%caller, %address, %role, "admin added");
        }

        self.admins.insert(
            address,
            AdminUser {
                address,
                role,
                permissions: PermissionSet::floor(role),
                added_at: now,
                added_by: caller,
            },
        );
        self.bootstrapped = true;
        sink.emit(PoolEvent::AdminAdded { address, role });
        Ok(())
    }

    /// Remove an admin; only an equal-or-higher role may do so
    pub fn remove_admin(&mut self, caller: Address, address: Address, sink: &mut dyn EventSink) -> Result<()> {
        let remover = self.require(&caller, Permission::ManageAdmins)?.role;
        let target = self.get(&address)?;
        if remover < target.role {
            return Err(PoolError::PermissionDenied(format!(
                "{} cannot remove a {}",
                remover, target.role
            )));
        }

        self.admins.remove(&address);
        tracing::info!(%caller, %address, "admin removed");
        sink.emit(PoolEvent::AdminRemoved { address });
        Ok(())
    }

    /// Change an admin's role and reset its permissions to the new floor
    pub fn update_admin_role(
        &mut self,
        caller: Address,
        address: Address,
        new_role: Role,
        sink: &mut dyn EventSink,
    ) -> Result<()> {
        let updater = self.require(&caller, Permission::ManageAdmins)?.role;
        let current = self.get(&address)?.role;
        if updater < current.max(new_role) {
            return Err(PoolError::PermissionDenied(format!(
                "{} cannot move a {} to {}",
                updater, current, new_role
            )));
        }

        if let Some(admin) = self.admins.get_mut(&address) {
            admin.role = new_role;
            admin.permissions = PermissionSet::floor(new_role);
        }
        tracing::info!(%caller, %address, from = %current, to = %new_role, "admin role updated");
        sink.emit(PoolEvent::AdminRoleUpdated {
            address,
            role: new_role,
        });
        Ok(())
    }

    /// Add one permission on top of the role floor
    pub fn grant_permission(
        &mut self,
        caller: Address,
        address: Address,
        perm: Permission,
        sink: &mut dyn EventSink,
    ) -> Result<()> {
        let granter = self.require(&caller, Permission::ManageAdmins)?;
        if !granter.has(perm) {
            return Err(PoolError::PermissionDenied(format!(
                "cannot grant {} without holding it",
                perm
            )));
        }
        let granter_role = granter.role;
        let target = self.get(&address)?;
        if granter_role < target.role {
            return Err(PoolError::PermissionDenied(format!(
                "{} cannot edit a {}",
                granter_role, target.role
            )));
        }
        if !PermissionSet::allowed_for(target.role, perm) {
            return Err(PoolError::PermissionDenied(format!(
                "{} requires at least the admin role",
                perm
            )));
        }
        if target.has(perm) {
            return Ok(());
        }

        if let Some(admin) = self.admins.get_mut(&address) {
            admin.permissions = admin.permissions.with(perm);
        }
        tracing::info!(%caller, %address, permission = %perm, "permission granted");
        sink.emit(PoolEvent::PermissionGranted {
            address,
            permission: perm,
        });
        Ok(())
    }

    /// Remove an explicitly granted permission (never below the role floor)
    pub fn revoke_permission(
        &mut self,
        caller: Address,
        address: Address,
        perm: Permission,
        sink: &mut dyn EventSink,
    ) -> Result<()> {
        let revoker = self.require(&caller, Permission::ManageAdmins)?.role;
        let target = self.get(&address)?;
        if revoker < target.role {
            return Err(PoolError::PermissionDenied(format!(
                "{} cannot edit a {}",
                revoker, target.role
            )));
        }
        if PermissionSet::floor(target.role).contains(perm) {
            return Err(PoolError::PermissionDenied(format!(
                "{} is part of the {} floor",
                perm, target.role
            )));
        }
        if !target.has(perm) {
            return Ok(());
        }

        if let Some(admin) = self.admins.get_mut(&address) {
            admin.permissions = admin.permissions.without(perm);
        }
        tracing::info!(%caller, %address, permission = %perm, "permission revoked");
        sink.emit(PoolEvent::PermissionRevoked {
            address,
            permission: perm,
        });
        Ok(())
    }

    /// Direct parameter edit, bypassing the vote
    pub fn update_parameter(
        &self,
        caller: Address,
        param: ParamKey,
        value: u128,
        now: Timestamp,
        store: &mut ParameterStore,
        sink: &mut dyn EventSink,
    ) -> Result<ParameterChange> {
        self.require(&caller, Permission::ManageParams)?;
        let change = store.set(param, value, now)?;
        tracing::info!(%caller, %param, old = change.old, new = change.new, "parameter set by admin");
        sink.emit(change.clone().into());
        Ok(change)
    }

    fn can_bootstrap(&self) -> bool {
        !self.bootstrapped && self.admins.is_empty()
    }

    fn require(&self, caller: &Address, perm: Permission) -> Result<&AdminUser> {
        self.admins
            .get(caller)
            .filter(|admin| admin.has(perm))
            .ok_or_else(|| PoolError::PermissionDenied(format!("{} lacks {}", caller, perm)))
    }

    fn get(&self, address: &Address) -> Result<&AdminUser> {
        self.admins
            .get(address)
            .ok_or_else(|| PoolError::AdminNotFound(address.to_hex()))
    }

    // === Queries ===

    pub fn has_permission(&self, address: &Address, perm: Permission) -> bool {
        self.admins.get(address).map(|a| a.has(perm)).unwrap_or(false)
    }

    pub fn is_admin(&self, address: &Address) -> bool {
        self.admins
            .get(address)
            .map(|a| a.role >= Role::Admin)
            .unwrap_or(false)
    }

    pub fn is_super_admin(&self, address: &Address) -> bool {
        self.admins
            .get(address)
            .map(|a| a.role == Role::SuperAdmin)
            .unwrap_or(false)
    }

    pub fn admin(&self, address: &Address) -> Option<&AdminUser> {
        self.admins.get(address)
    }

    pub fn admins(&self) -> impl Iterator<Item = &AdminUser> {
        self.admins.values()
    }

    pub fn len(&self) -> usize {
        self.admins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.admins.is_empty()
    }
}
