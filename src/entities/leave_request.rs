//! Leave request entity - A date range off work moving through review.
//!
//! Status only ever moves PENDING -> APPROVED or PENDING -> REJECTED.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of leave requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum LeaveType {
    /// Paid time off
    #[sea_orm(string_value = "PAID")]
    Paid,
    /// Sick leave
    #[sea_orm(string_value = "SICK")]
    Sick,
    /// Unpaid leave
    #[sea_orm(string_value = "UNPAID")]
    Unpaid,
}

/// Review state of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum LeaveStatus {
    /// Awaiting review
    #[sea_orm(string_value = "PENDING")]
    Pending,
    /// Accepted by a reviewer
    #[sea_orm(string_value = "APPROVED")]
    Approved,
    /// Declined by a reviewer
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
}

impl LeaveStatus {
    /// APPROVED and REJECTED have no outgoing transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

/// Leave request database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "leave_requests")]
pub struct Model {
    /// Unique identifier for the request
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Requesting employee
    pub employee_id: i64,
    /// First day off (inclusive)
    pub start_date: Date,
    /// Last day off (inclusive)
    pub end_date: Date,
    /// Kind of leave
    pub leave_type: LeaveType,
    /// Free-text justification
    pub reason: String,
    /// Review state
    pub status: LeaveStatus,
    /// Reviewer's comment, if any
    pub comment: Option<String>,
    /// Employee id of the reviewer
    pub reviewed_by: Option<i64>,
    /// When the request was reviewed
    pub reviewed_at: Option<DateTimeUtc>,
    /// When the request was filed
    pub created_at: DateTimeUtc,
}

/// Defines relationships between `LeaveRequest` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each request belongs to one employee
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
