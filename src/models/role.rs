// Acting-user roles

//! # Roles
//!
//! The admin console historically compared roles by sniffing the shape of
//! whatever the identity service returned (a bare string, or an object with a
//! `roleName` / `name` field). Here the role is resolved **once** at the
//! boundary into a closed enum, and the engine only ever sees [`Role`].
//!
//! ## Administrative override
//!
//! [`Role::Admin`] passes every role check in the transition guard. It is an
//! explicit escape valve for operators who need to unblock a document whose
//! responsible role is unavailable.

use serde::{Deserialize, Serialize};

use super::ids::{RoleId, UserId};

/// Role of the user acting on a document
///
/// Serialized with an explicit tag so transports never need to guess:
/// `{"kind": "admin"}` or `{"kind": "member", "role_id": "legal"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Role {
    /// Administrative override, bypasses all role checks
    Admin,

    /// A regular role reference from the identity provider
    Member { role_id: RoleId },
}

impl Role {
    /// Shorthand for a member role
    pub fn member<R: Into<RoleId>>(role_id: R) -> Self {
        Role::Member {
            role_id: role_id.into(),
        }
    }

    /// Whether this role carries the administrative override
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Check whether this role may act on a step gated to `required`
    ///
    /// A step with no responsible role is open to every authenticated user.
    pub fn satisfies(&self, required: Option<&RoleId>) -> bool {
        match (self, required) {
            (Role::Admin, _) => true,
            (_, None) => true,
            (Role::Member { role_id }, Some(required)) => role_id == required,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Member { role_id } => write!(f, "{}", role_id),
        }
    }
}

/// The user performing an operation, with their already-resolved role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new<U: Into<UserId>>(user_id: U, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }
}
