//! Common type definitions shared across the API, auth and persistence layers.
//!
//! # ID Types
//!
//! All entity IDs are UUIDs wrapped in type aliases:
//!
//! - [`UserId`]: User account identifier
//! - [`ItemId`]: Owned item identifier
//! - [`TokenId`]: Stored refresh/access token pair identifier
//!
//! # Access vocabulary
//!
//! [`Resource`] and [`Operation`] name what a caller attempted when a policy check refuses them.
//! They appear in logs and in [`crate::errors::Error::InsufficientPermissions`]; the message a
//! client sees comes from the policy denial itself.

use std::fmt;
use uuid::Uuid;

pub type UserId = Uuid;
pub type ItemId = Uuid;
pub type TokenId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

/// Operations that can be performed on resources.
///
/// `Own` variants act on the caller's own account or items, `Any` variants on someone else's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateOwn,
    ReadOwn,
    ReadAny,
    UpdateOwn,
    UpdateAny,
    DeleteOwn,
    DeleteAny,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::CreateOwn => "create own",
            Operation::ReadOwn => "read own",
            Operation::ReadAny => "read",
            Operation::UpdateOwn => "update own",
            Operation::UpdateAny => "update",
            Operation::DeleteOwn => "delete own",
            Operation::DeleteAny => "delete",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Users,
    Items,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Users => f.write_str("users"),
            Resource::Items => f.write_str("items"),
        }
    }
}
