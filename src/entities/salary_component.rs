//! Salary component entity - One named line of a salary structure.
//!
//! `basis` says how `value` is read: a fixed amount, a percentage of the wage,
//! a percentage of `base_component`, or the wage remainder (value unused).

use super::decimal_text::DecimalText;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Whether a component adds to or subtracts from pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum ComponentKind {
    /// Basic pay and allowances
    #[sea_orm(string_value = "EARNING")]
    Earning,
    /// Provident fund, taxes and other deductions
    #[sea_orm(string_value = "DEDUCTION")]
    Deduction,
}

/// Persisted discriminant of a component basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum BasisKind {
    /// `value` is the amount
    #[sea_orm(string_value = "FIXED")]
    Fixed,
    /// `value` percent of the wage
    #[sea_orm(string_value = "PERCENT_OF_WAGE")]
    PercentOfWage,
    /// `value` percent of `base_component`
    #[sea_orm(string_value = "PERCENT_OF_COMPONENT")]
    PercentOfComponent,
    /// Whatever the wage leaves after every other earning
    #[sea_orm(string_value = "WAGE_REMAINDER")]
    WageRemainder,
}

/// Salary component database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "salary_components")]
pub struct Model {
    /// Unique identifier for the component row
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Structure (employee) the component belongs to
    pub employee_id: i64,
    /// Component name, unique within the structure
    pub name: String,
    /// Earning or deduction
    pub kind: ComponentKind,
    /// How `value` is interpreted
    pub basis: BasisKind,
    /// Amount or percentage
    #[sea_orm(column_type = "Text")]
    pub value: DecimalText,
    /// Referenced component for `PERCENT_OF_COMPONENT`
    pub base_component: Option<String>,
    /// Display order within the structure
    pub position: i32,
}

/// Defines relationships between `SalaryComponent` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each component belongs to one salary structure
    #[sea_orm(
        belongs_to = "super::salary_structure::Entity",
        from = "Column::EmployeeId",
        to = "super::salary_structure::Column::EmployeeId"
    )]
    SalaryStructure,
}

impl Related<super::salary_structure::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SalaryStructure.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
