//! Attendance record entity - One row per employee per calendar day.
//!
//! The pair (`employee_id`, `date`) is unique; the index backing that is
//! created alongside the table in `config::database`. The authoritative state
//! is the presence of `check_in` / `check_out`; `status` is derived.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Presentation status of a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum AttendanceStatus {
    /// Checked in (and, if checked out, worked at least the half-day threshold)
    #[sea_orm(string_value = "PRESENT")]
    Present,
    /// No attendance for the day
    #[sea_orm(string_value = "ABSENT")]
    Absent,
    /// Checked out before the half-day threshold
    #[sea_orm(string_value = "HALF_DAY")]
    HalfDay,
    /// Covered by approved leave
    #[sea_orm(string_value = "ON_LEAVE")]
    OnLeave,
}

/// Attendance record database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "attendance_records")]
pub struct Model {
    /// Unique identifier for the record
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Employee the day belongs to
    pub employee_id: i64,
    /// Server-local calendar date
    pub date: Date,
    /// When the employee checked in
    pub check_in: Option<DateTimeUtc>,
    /// When the employee checked out, None while the day is open
    pub check_out: Option<DateTimeUtc>,
    /// Derived status
    pub status: AttendanceStatus,
}

/// Defines relationships between `AttendanceRecord` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each record belongs to one employee
    #[sea_orm(
        belongs_to = "super::employee::Entity",
        from = "Column::EmployeeId",
        to = "super::employee::Column::Id"
    )]
    Employee,
}

impl Related<super::employee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Employee.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
