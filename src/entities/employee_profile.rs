//! Employee profile entity - Personal and organisational details, 1:1 with employees.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Employee profile database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "employee_profiles")]
pub struct Model {
    /// Owning employee; also the primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub employee_id: i64,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Contact phone number
    pub phone: Option<String>,
    /// Department, e.g. "Engineering"
    pub department: Option<String>,
    /// Job title
    pub designation: Option<String>,
    /// First working day
    pub joining_date: Date,
    /// When the profile was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between `EmployeeProfile` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each profile belongs to one employee
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
