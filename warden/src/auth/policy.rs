//! Role and ownership authorization.
//!
//! Roles are totally ordered (`Basic < Admin < Superuser`). A caller may act on an account or
//! item when it is their own, or when their role is strictly above the role of the account
//! involved. Equal roles never authorize each other.
//!
//! The predicates are pure. The `check_*` functions wrap them and pick the [`Denial`] shown to
//! the caller; handlers turn a denial into [`Error::InsufficientPermissions`] via
//! [`Denial::forbid`].

use std::fmt;

use crate::{
    api::models::users::{CurrentUser, Role, UserUpdate},
    errors::Error,
    types::{Operation, Resource, UserId},
};

pub fn is_admin(role: Role) -> bool {
    role >= Role::Admin
}

pub fn is_superuser(role: Role) -> bool {
    role == Role::Superuser
}

pub fn is_self(user: &CurrentUser, target_id: UserId) -> bool {
    user.id == target_id
}

/// Self, or strictly higher role than the target.
pub fn is_authorized(user: &CurrentUser, target_id: UserId, target_role: Role) -> bool {
    is_self(user, target_id) || user.role > target_role
}

/// Why a caller was refused. The `Display` text is returned to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    AccountOwner,
    AccountOwnerOrSuperuser,
    AccountOwnerOrAdmin,
    ItemOwner,
    ItemOwnerOrSuperuser,
    ItemOwnerOrAdmin,
    Superuser,
    Admin,
}

impl Denial {
    fn for_account(target_role: Role) -> Self {
        match target_role {
            Role::Superuser => Denial::AccountOwner,
            Role::Admin => Denial::AccountOwnerOrSuperuser,
            Role::Basic => Denial::AccountOwnerOrAdmin,
        }
    }

    fn for_item(owner_role: Role) -> Self {
        match owner_role {
            Role::Superuser => Denial::ItemOwner,
            Role::Admin => Denial::ItemOwnerOrSuperuser,
            Role::Basic => Denial::ItemOwnerOrAdmin,
        }
    }

    pub fn forbid(self, action: Operation, resource: Resource) -> Error {
        Error::InsufficientPermissions {
            action,
            resource,
            denial: self,
        }
    }
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Denial::AccountOwner => "Only the owner of this account can perform this action",
            Denial::AccountOwnerOrSuperuser => "Only the owner of this account or a superuser can perform this action",
            Denial::AccountOwnerOrAdmin => "Only the owner of this account, an administrator or a superuser can perform this action",
            Denial::ItemOwner => "Only the owner of this item can perform this action",
            Denial::ItemOwnerOrSuperuser => "Only the owner of this item or a superuser can perform this action",
            Denial::ItemOwnerOrAdmin => "Only the owner of this item, an administrator or a superuser can perform this action",
            Denial::Superuser => "Only a superuser can perform this action",
            Denial::Admin => "Only an administrator or a superuser can perform this action",
        };
        f.write_str(message)
    }
}

pub fn check_account_access(user: &CurrentUser, target_id: UserId, target_role: Role) -> Result<(), Denial> {
    if is_authorized(user, target_id, target_role) {
        Ok(())
    } else {
        Err(Denial::for_account(target_role))
    }
}

pub fn check_item_access(user: &CurrentUser, owner_id: UserId, owner_role: Role) -> Result<(), Denial> {
    if is_self(user, owner_id) || user.role > owner_role {
        Ok(())
    } else {
        Err(Denial::for_item(owner_role))
    }
}

/// Role changes need a superuser, verification changes an administrator.
pub fn check_profile_update(user: &CurrentUser, update: &UserUpdate) -> Result<(), Denial> {
    if update.role.is_some() && !is_superuser(user.role) {
        return Err(Denial::Superuser);
    }
    if update.verified.is_some() && !is_admin(user.role) {
        return Err(Denial::Admin);
    }
    Ok(())
}
