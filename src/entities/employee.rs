//! Employee entity - The identity every ledger row hangs off.
//!
//! Employees are never hard-deleted: deactivation flips `is_active` so that
//! attendance, leave and payroll history keep a valid owner.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Access level carried by an employee and by the caller's principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum Role {
    /// Full administrative access
    #[sea_orm(string_value = "ADMIN")]
    Admin,
    /// Human resources; reviews leave and manages payroll
    #[sea_orm(string_value = "HR")]
    Hr,
    /// Regular employee; sees only their own rows
    #[sea_orm(string_value = "EMPLOYEE")]
    Employee,
}

impl Role {
    /// Admin and HR may read across employees and review requests.
    #[must_use]
    pub const fn is_privileged(self) -> bool {
        matches!(self, Self::Admin | Self::Hr)
    }
}

/// Employee database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "employees")]
pub struct Model {
    /// Numeric identity
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Human-readable code, e.g. `OIJODO20260001`; immutable once assigned
    #[sea_orm(unique)]
    pub employee_code: String,
    /// Login email, unique across employees
    #[sea_orm(unique)]
    pub email: String,
    /// Access level
    pub role: Role,
    /// Two-letter code of the owning company
    pub company_code: String,
    /// False once the employee has been deactivated
    pub is_active: bool,
    /// When the employee was provisioned
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Employee and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One employee has one profile
    #[sea_orm(has_one = "super::employee_profile::Entity")]
    Profile,
    /// One employee has many attendance records
    #[sea_orm(has_many = "super::attendance_record::Entity")]
    AttendanceRecords,
    /// One employee has many leave requests
    #[sea_orm(has_many = "super::leave_request::Entity")]
    LeaveRequests,
    /// One employee has at most one salary structure
    #[sea_orm(has_one = "super::salary_structure::Entity")]
    SalaryStructure,
    /// One employee has many payroll records
    #[sea_orm(has_many = "super::payroll_record::Entity")]
    PayrollRecords,
}

impl Related<super::employee_profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Profile.def()
    }
}

impl Related<super::attendance_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AttendanceRecords.def()
    }
}

impl Related<super::leave_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LeaveRequests.def()
    }
}

impl Related<super::salary_structure::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SalaryStructure.def()
    }
}

impl Related<super::payroll_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PayrollRecords.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
