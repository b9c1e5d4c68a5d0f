//! Attendance business logic - The per-day check-in / check-out state machine.
//!
//! Each (employee, date) moves `NO_RECORD -> CHECKED_IN -> CHECKED_OUT` and
//! never back. "Today" is the server-local calendar date of the call. The
//! unique index on (`employee_id`, `date`) settles concurrent check-ins, and
//! check-out only writes while `check_out IS NULL`.

use crate::{
    core::{employee, store},
    entities::{AttendanceRecord, AttendanceStatus, attendance_record},
    errors::{Error, Result},
};
use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use sea_orm::{ActiveEnum, QueryOrder, Set, prelude::*, sea_query::Expr};
use tracing::{debug, info, instrument};

/// Server-local calendar date of an instant.
#[must_use]
pub fn local_date(at: DateTime<Utc>) -> NaiveDate {
    at.with_timezone(&Local).date_naive()
}

/// Time worked on a closed day; `None` while the day is still open.
#[must_use]
pub fn work_duration(record: &attendance_record::Model) -> Option<Duration> {
    match (record.check_in, record.check_out) {
        (Some(check_in), Some(check_out)) => Some(check_out - check_in),
        _ => None,
    }
}

/// Status of a closed day: HALF_DAY below the threshold, PRESENT otherwise.
#[must_use]
pub fn derive_status(
    check_in: DateTime<Utc>,
    check_out: DateTime<Utc>,
    half_day_threshold: Duration,
) -> AttendanceStatus {
    if check_out - check_in < half_day_threshold {
        AttendanceStatus::HalfDay
    } else {
        AttendanceStatus::Present
    }
}

/// Finds the record of one employee for one date.
pub async fn get_day<C>(
    db: &C,
    employee_id: i64,
    date: NaiveDate,
) -> Result<Option<attendance_record::Model>>
where
    C: ConnectionTrait,
{
    AttendanceRecord::find()
        .filter(attendance_record::Column::EmployeeId.eq(employee_id))
        .filter(attendance_record::Column::Date.eq(date))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Inserts the opening row of a day.
///
/// A concurrent check-in that got there first surfaces as a unique
/// violation and is reported as `AlreadyCheckedIn`.
pub(crate) async fn insert_check_in<C>(
    db: &C,
    employee_id: i64,
    date: NaiveDate,
    at: DateTime<Utc>,
) -> Result<attendance_record::Model>
where
    C: ConnectionTrait,
{
    attendance_record::ActiveModel {
        employee_id: Set(employee_id),
        date: Set(date),
        check_in: Set(Some(at)),
        check_out: Set(None),
        status: Set(AttendanceStatus::Present),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| {
        if store::is_unique_violation(&e) {
            Error::AlreadyCheckedIn { employee_id, date }
        } else {
            employee::employee_fk_error(e, employee_id)
        }
    })
}

/// Checks an employee in for today.
pub async fn check_in(db: &DatabaseConnection, employee_id: i64) -> Result<attendance_record::Model> {
    check_in_at(db, employee_id, Utc::now()).await
}

/// Checks an employee in at `at`, for the local date of `at`.
///
/// # Errors
/// * `EmployeeNotFound` / `EmployeeInactive` - unknown or deactivated employee
/// * `AlreadyCheckedIn` - the day already has a record
#[instrument(skip(db))]
pub async fn check_in_at(
    db: &DatabaseConnection,
    employee_id: i64,
    at: DateTime<Utc>,
) -> Result<attendance_record::Model> {
    let date = local_date(at);
    let txn = store::begin_serializable(db).await?;

    employee::require_active(&txn, employee_id).await?;
    if get_day(&txn, employee_id, date).await?.is_some() {
        return Err(Error::AlreadyCheckedIn { employee_id, date });
    }

    let record = insert_check_in(&txn, employee_id, date, at).await?;
    txn.commit().await.map_err(|e| {
        if store::is_unique_violation(&e) {
            Error::AlreadyCheckedIn { employee_id, date }
        } else {
            e.into()
        }
    })?;

    info!(employee_id, %date, "Checked in");
    Ok(record)
}

/// Checks an employee out for today.
pub async fn check_out(
    db: &DatabaseConnection,
    employee_id: i64,
    half_day_threshold: Duration,
) -> Result<attendance_record::Model> {
    check_out_at(db, employee_id, Utc::now(), half_day_threshold).await
}

/// Checks an employee out at `at`, closing the record of the local date of `at`.
///
/// # Errors
/// * `EmployeeNotFound` / `EmployeeInactive` - unknown or deactivated employee
/// * `NoCheckInFound` - the day has no record
/// * `AlreadyCheckedOut` - the day is already closed, including by a
///   concurrent check-out that won the conditional update
#[instrument(skip(db))]
pub async fn check_out_at(
    db: &DatabaseConnection,
    employee_id: i64,
    at: DateTime<Utc>,
    half_day_threshold: Duration,
) -> Result<attendance_record::Model> {
    let date = local_date(at);
    let txn = store::begin_serializable(db).await?;

    employee::require_active(&txn, employee_id).await?;
    let record = get_day(&txn, employee_id, date)
        .await?
        .ok_or(Error::NoCheckInFound { employee_id, date })?;
    if record.check_out.is_some() {
        return Err(Error::AlreadyCheckedOut { employee_id, date });
    }

    let status = record
        .check_in
        .map_or(AttendanceStatus::Present, |check_in| {
            derive_status(check_in, at, half_day_threshold)
        });

    let result = AttendanceRecord::update_many()
        .col_expr(attendance_record::Column::CheckOut, Expr::value(at))
        .col_expr(attendance_record::Column::Status, Expr::value(status.to_value()))
        .filter(attendance_record::Column::Id.eq(record.id))
        .filter(attendance_record::Column::CheckOut.is_null())
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(Error::AlreadyCheckedOut { employee_id, date });
    }
    txn.commit().await?;

    info!(employee_id, %date, ?status, "Checked out");
    Ok(attendance_record::Model {
        check_out: Some(at),
        status,
        ..record
    })
}

/// Lists attendance filtered by employee and/or date, newest day first.
///
/// Omitting `employee_id` returns every employee's rows; callers gate that
/// to privileged principals.
pub async fn get_attendance(
    db: &DatabaseConnection,
    employee_id: Option<i64>,
    date: Option<NaiveDate>,
) -> Result<Vec<attendance_record::Model>> {
    debug!(?employee_id, ?date, "Querying attendance");
    let mut query = AttendanceRecord::find();
    if let Some(employee_id) = employee_id {
        query = query.filter(attendance_record::Column::EmployeeId.eq(employee_id));
    }
    if let Some(date) = date {
        query = query.filter(attendance_record::Column::Date.eq(date));
    }
    query
        .order_by_desc(attendance_record::Column::Date)
        .order_by_asc(attendance_record::Column::EmployeeId)
        .all(db)
        .await
        .map_err(Into::into)
}
