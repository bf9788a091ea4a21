use serde::{Deserialize, Serialize};

use crate::{AppError, AppResult};

pub const DENIED_CODE: &str = "AUTH/DENIED";

/// Closed role set. The host's identity system hands us at most one role
/// label per principal; everything it says is translated here, and the gate
/// below only ever reasons over this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Unauthenticated,
    Driver,
    LogisticManager,
    Administrator,
}

impl Role {
    /// Boundary translation from the host's dynamic role strings. Unknown
    /// labels and roleless accounts get no permissions.
    pub fn from_label(label: Option<&str>, authenticated: bool) -> Role {
        if !authenticated {
            return Role::Unauthenticated;
        }
        match label {
            Some("driver") => Role::Driver,
            Some("logistic_manager") => Role::LogisticManager,
            Some("administrator") => Role::Administrator,
            _ => Role::Unauthenticated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Principal {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.role != Role::Unauthenticated
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    SubmitTrip,
    ViewTripsReport,
    EditMatrix,
    ViewMatrixSelector,
}

const DRIVER_OPS: &[Operation] = &[Operation::SubmitTrip, Operation::ViewMatrixSelector];

const MANAGER_OPS: &[Operation] = &[
    Operation::SubmitTrip,
    Operation::ViewMatrixSelector,
    Operation::ViewTripsReport,
    Operation::EditMatrix,
];

// Administrators hold the manager permission set in full; the subsumption
// lives here, in one place, not as hierarchy checks at call sites.
const ADMIN_OPS: &[Operation] = MANAGER_OPS;

pub fn permitted_operations(role: Role) -> &'static [Operation] {
    match role {
        Role::Unauthenticated => &[],
        Role::Driver => DRIVER_OPS,
        Role::LogisticManager => MANAGER_OPS,
        Role::Administrator => ADMIN_OPS,
    }
}

pub fn allows(role: Role, operation: Operation) -> bool {
    permitted_operations(role).contains(&operation)
}

/// Pure allow/deny decision. Denials carry no hint about what the target
/// data is or whether it exists.
pub fn authorize(principal: &Principal, operation: Operation) -> AppResult<()> {
    if allows(principal.role, operation) {
        Ok(())
    } else {
        Err(AppError::new(DENIED_CODE, "Access denied"))
    }
}

/// Where the host should send a principal that lands in its administrative
/// area. Drivers and logistic managers are barred from it entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAreaRedirect {
    Home,
    ManagerDashboard,
}

pub fn admin_area_redirect(role: Role) -> Option<AdminAreaRedirect> {
    match role {
        Role::Driver => Some(AdminAreaRedirect::Home),
        Role::LogisticManager => Some(AdminAreaRedirect::ManagerDashboard),
        Role::Administrator | Role::Unauthenticated => None,
    }
}

/// Host-side user storage, consulted only to render display names.
pub trait UserDirectory: Send + Sync {
    fn display_name(&self, user_id: &str) -> Option<String>;
}
