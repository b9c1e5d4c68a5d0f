//! Caller identity and row scoping.
//!
//! The principal is authenticated elsewhere and trusted as given. Scoping only
//! decides which employee's rows a read may cover.

use crate::{entities::Role, errors::{Error, Result}};
use serde::{Deserialize, Serialize};

/// The authenticated caller of a ledger operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Caller's employee id
    pub employee_id: i64,
    /// Caller's role
    pub role: Role,
}

impl Principal {
    /// Creates a principal.
    #[must_use]
    pub const fn new(employee_id: i64, role: Role) -> Self {
        Self { employee_id, role }
    }

    /// Whether the caller may act across employees.
    #[must_use]
    pub const fn is_privileged(&self) -> bool {
        self.role.is_privileged()
    }

    /// Narrows a requested employee filter to what the caller may read.
    ///
    /// Privileged callers get the filter unchanged, `None` meaning everyone.
    /// Others are pinned to their own id, and asking for anyone else fails.
    ///
    /// # Errors
    /// * `Forbidden` - a non-privileged caller named another employee
    pub fn scope(&self, requested: Option<i64>, resource: &str) -> Result<Option<i64>> {
        if self.is_privileged() {
            return Ok(requested);
        }
        match requested {
            Some(id) if id != self.employee_id => Err(Error::Forbidden {
                employee_id: self.employee_id,
                resource: format!("{resource} of employee {id}"),
            }),
            _ => Ok(Some(self.employee_id)),
        }
    }

    /// Fails unless the caller is Admin or HR.
    ///
    /// # Errors
    /// * `Forbidden` - the caller is a regular employee
    pub fn require_privileged(&self, action: &str) -> Result<()> {
        if self.is_privileged() {
            Ok(())
        } else {
            Err(Error::Forbidden {
                employee_id: self.employee_id,
                resource: action.to_string(),
            })
        }
    }
}
