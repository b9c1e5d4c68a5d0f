//! Payroll record entity - Net pay of one employee for one month.
//!
//! Keyed by (`employee_id`, `month`). Rows are derived from the salary
//! structure and overwritten, never appended, by each payroll run.

use super::decimal_text::DecimalText;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payroll record database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payroll_records")]
pub struct Model {
    /// Unique identifier for the record
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Paid employee
    pub employee_id: i64,
    /// Pay month as `YYYY-MM`
    pub month: String,
    /// Resolved Basic component
    #[sea_orm(column_type = "Text")]
    pub basic_salary: DecimalText,
    /// Sum of every earning except Basic
    #[sea_orm(column_type = "Text")]
    pub total_allowances: DecimalText,
    /// Sum of every deduction
    #[sea_orm(column_type = "Text")]
    pub total_deductions: DecimalText,
    /// `basic_salary + total_allowances - total_deductions`
    #[sea_orm(column_type = "Text")]
    pub net_salary: DecimalText,
    /// When these amounts were last written
    pub generated_at: DateTimeUtc,
}

/// Defines relationships between `PayrollRecord` and other entities
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
