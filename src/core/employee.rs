//! Employee business logic - Provisioning rows, profile edits and deactivation.
//!
//! New employees are created through [`crate::core::identifier`], which owns
//! the transaction that claims their code. Employees are never deleted;
//! deactivation keeps their ledger history attached to a valid identity.

use crate::{
    core::{identifier, store},
    entities::{Employee, EmployeeProfile, Role, employee, employee_profile},
    errors::{Error, Result},
};
use chrono::{Datelike, Local, NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Input for provisioning a new employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEmployee {
    /// Given name; its first two letters go into the code
    pub first_name: String,
    /// Family name; its first two letters go into the code
    pub last_name: String,
    /// Login email, must be unused
    pub email: String,
    /// Access level
    pub role: Role,
    /// Contact phone number
    pub phone: Option<String>,
    /// Department
    pub department: Option<String>,
    /// Job title
    pub designation: Option<String>,
    /// First working day
    pub joining_date: NaiveDate,
}

/// Partial profile update; `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    /// New phone number
    pub phone: Option<String>,
    /// New department
    pub department: Option<String>,
    /// New job title
    pub designation: Option<String>,
}

/// An employee together with their profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmployeeRecord {
    /// Identity row
    pub employee: employee::Model,
    /// Profile row
    pub profile: employee_profile::Model,
}

/// Whether any employee already uses `email`.
pub(crate) async fn email_in_use<C>(db: &C, email: &str) -> Result<bool>
where
    C: ConnectionTrait,
{
    let existing = Employee::find()
        .filter(employee::Column::Email.eq(email.trim()))
        .one(db)
        .await?;
    Ok(existing.is_some())
}

/// Inserts the employee and profile rows under an already chosen code.
///
/// Returns the raw store error so the allocator can tell a lost race
/// (unique violation) from other failures.
pub(crate) async fn insert_employee_rows<C>(
    db: &C,
    code: &str,
    company_code: &str,
    new_employee: &NewEmployee,
) -> std::result::Result<EmployeeRecord, DbErr>
where
    C: ConnectionTrait,
{
    let now = Utc::now();
    let employee = employee::ActiveModel {
        employee_code: Set(code.to_string()),
        email: Set(new_employee.email.trim().to_string()),
        role: Set(new_employee.role),
        company_code: Set(company_code.to_string()),
        is_active: Set(true),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let profile = employee_profile::ActiveModel {
        employee_id: Set(employee.id),
        first_name: Set(new_employee.first_name.trim().to_string()),
        last_name: Set(new_employee.last_name.trim().to_string()),
        phone: Set(new_employee.phone.clone()),
        department: Set(new_employee.department.clone()),
        designation: Set(new_employee.designation.clone()),
        joining_date: Set(new_employee.joining_date),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    Ok(EmployeeRecord { employee, profile })
}

/// Provisions an employee under the next code of the current local year.
///
/// See [`identifier::allocate_employee_code`] for the allocation rules.
pub async fn provision_employee(
    db: &DatabaseConnection,
    company_code: &str,
    new_employee: &NewEmployee,
    max_attempts: u32,
) -> Result<EmployeeRecord> {
    let year = Local::now().year();
    identifier::allocate_employee_code(db, company_code, new_employee, year, max_attempts).await
}

/// Loads an employee and fails unless they exist and are active.
pub(crate) async fn require_active<C>(db: &C, employee_id: i64) -> Result<employee::Model>
where
    C: ConnectionTrait,
{
    let employee = Employee::find_by_id(employee_id)
        .one(db)
        .await?
        .ok_or(Error::EmployeeNotFound { employee_id })?;
    if !employee.is_active {
        return Err(Error::EmployeeInactive { employee_id });
    }
    Ok(employee)
}

/// Finds an employee and their profile by id.
pub async fn get_employee<C>(db: &C, employee_id: i64) -> Result<Option<EmployeeRecord>>
where
    C: ConnectionTrait,
{
    let found = Employee::find_by_id(employee_id)
        .find_also_related(EmployeeProfile)
        .one(db)
        .await?;

    match found {
        Some((employee, Some(profile))) => Ok(Some(EmployeeRecord { employee, profile })),
        Some((employee, None)) => Err(Error::Store {
            message: format!("employee {} has no profile row", employee.id),
        }),
        None => Ok(None),
    }
}

/// Finds an employee by their human-readable code.
pub async fn get_employee_by_code(
    db: &DatabaseConnection,
    employee_code: &str,
) -> Result<Option<employee::Model>> {
    Employee::find()
        .filter(employee::Column::EmployeeCode.eq(employee_code))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists employees ordered by code, optionally only the active ones.
pub async fn list_employees(
    db: &DatabaseConnection,
    active_only: bool,
) -> Result<Vec<employee::Model>> {
    let mut query = Employee::find();
    if active_only {
        query = query.filter(employee::Column::IsActive.eq(true));
    }
    query
        .order_by_asc(employee::Column::EmployeeCode)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Applies a partial update to an employee's profile.
#[instrument(skip(db, update))]
pub async fn update_profile(
    db: &DatabaseConnection,
    employee_id: i64,
    update: ProfileUpdate,
) -> Result<employee_profile::Model> {
    let profile = EmployeeProfile::find_by_id(employee_id)
        .one(db)
        .await?
        .ok_or(Error::EmployeeNotFound { employee_id })?;

    let mut active: employee_profile::ActiveModel = profile.into();
    if let Some(phone) = update.phone {
        active.phone = Set(Some(phone));
    }
    if let Some(department) = update.department {
        active.department = Set(Some(department));
    }
    if let Some(designation) = update.designation {
        active.designation = Set(Some(designation));
    }
    active.updated_at = Set(Utc::now());

    Ok(active.update(db).await?)
}

/// Marks an employee inactive. Deactivating twice is a no-op.
#[instrument(skip(db))]
pub async fn deactivate_employee(
    db: &DatabaseConnection,
    employee_id: i64,
) -> Result<employee::Model> {
    let employee = Employee::find_by_id(employee_id)
        .one(db)
        .await?
        .ok_or(Error::EmployeeNotFound { employee_id })?;

    if !employee.is_active {
        return Ok(employee);
    }

    let mut active: employee::ActiveModel = employee.into();
    active.is_active = Set(false);
    let updated = active.update(db).await?;
    info!(employee_id, "Employee deactivated");
    Ok(updated)
}

/// Maps a foreign-key failure on an employee-owned row to `EmployeeNotFound`.
pub(crate) fn employee_fk_error(err: DbErr, employee_id: i64) -> Error {
    if store::is_foreign_key_violation(&err) {
        Error::EmployeeNotFound { employee_id }
    } else {
        err.into()
    }
}
