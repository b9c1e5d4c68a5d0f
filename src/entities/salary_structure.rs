//! Salary structure entity - The current compensation definition of an employee.
//!
//! One row per employee holding the monthly wage; the named components live
//! in `salary_components`. Only the current structure is kept.

use super::decimal_text::DecimalText;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Salary structure database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "salary_structures")]
pub struct Model {
    /// Owning employee; also the primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub employee_id: i64,
    /// Monthly wage the percentage bases refer to
    #[sea_orm(column_type = "Text")]
    pub wage: DecimalText,
    /// When the structure was last replaced
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `SalaryStructure` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each structure belongs to one employee
    #[sea_orm(
        belongs_to = "super::employee::Entity",
        from = "Column::EmployeeId",
        to = "super::employee::Column::Id"
    )]
    Employee,
    /// One structure has many components
    #[sea_orm(has_many = "super::salary_component::Entity")]
    Components,
}

impl Related<super::employee::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Employee.def()
    }
}

impl Related<super::salary_component::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Components.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
