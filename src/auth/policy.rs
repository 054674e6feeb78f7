//! Centralized permission table.
//!
//! Every guarded operation names an [`Action`]. [`authorize`] looks the action
//! up in [`RULES`] and checks the caller's role. Ownership is not a runtime
//! check: a [`Scope::Caller`] operation only ever addresses the caller's own
//! resource, whose id comes from the token and never from the request.

use super::Caller;
use crate::db::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CreateBooking,
    ListOwnBookings,
    EditOwnProfile,
    Subscribe,
    ApproveTherapist,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::CreateBooking => "create bookings",
            Action::ListOwnBookings => "list bookings",
            Action::EditOwnProfile => "edit therapist profiles",
            Action::Subscribe => "upgrade subscriptions",
            Action::ApproveTherapist => "approve therapists",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which resource a permitted role acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Target named by the request
    Any,
    /// The caller's own resource, identified by the token id
    Caller,
}

#[derive(Debug)]
pub struct Rule {
    pub action: Action,
    pub roles: &'static [Role],
    pub scope: Scope,
}

const EVERY_ROLE: &[Role] = &[Role::Client, Role::Therapist, Role::Admin];

pub static RULES: &[Rule] = &[
    Rule {
        action: Action::CreateBooking,
        roles: EVERY_ROLE,
        scope: Scope::Any,
    },
    Rule {
        action: Action::ListOwnBookings,
        roles: EVERY_ROLE,
        scope: Scope::Caller,
    },
    Rule {
        action: Action::EditOwnProfile,
        roles: &[Role::Therapist],
        scope: Scope::Caller,
    },
    Rule {
        action: Action::Subscribe,
        roles: &[Role::Therapist],
        scope: Scope::Caller,
    },
    Rule {
        action: Action::ApproveTherapist,
        roles: &[Role::Admin],
        scope: Scope::Any,
    },
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Denied {
    #[error("role '{role}' is not allowed to {action}")]
    RoleNotPermitted { role: Role, action: Action },
}

pub fn rule_for(action: Action) -> Option<&'static Rule> {
    RULES.iter().find(|rule| rule.action == action)
}

/// Decide whether `caller` may perform `action`. Actions missing from the
/// table are denied.
pub fn authorize(caller: &Caller, action: Action) -> Result<(), Denied> {
    match rule_for(action) {
        Some(rule) if rule.roles.contains(&caller.role) => Ok(()),
        _ => Err(Denied::RoleNotPermitted {
            role: caller.role,
            action,
        }),
    }
}
