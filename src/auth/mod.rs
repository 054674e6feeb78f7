//! Identity: password hashing, session tokens and the permission table.

pub mod password;
pub mod policy;
pub mod token;

pub use password::{hash_password, verify_password};
pub use policy::{authorize, Action, Denied, Scope};
pub use token::{Claims, TokenError, TokenService};

use crate::db::Role;

/// Identity resolved from a verified session token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub id: i64,
    pub role: Role,
}
