//! Leave business logic - Requests and their one-time review.
//!
//! Overlapping requests are allowed; the reviewer resolves overlaps. A request
//! is reviewed at most once: the status update is conditioned on the row
//! still being PENDING, so a second review fails with `AlreadyReviewed`.

use crate::{
    core::{employee, store},
    entities::{LeaveRequest, LeaveStatus, LeaveType, leave_request},
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{ActiveEnum, QueryOrder, Set, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// A leave request as filed by an employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveApplication {
    /// First day off (inclusive)
    pub start_date: NaiveDate,
    /// Last day off (inclusive)
    pub end_date: NaiveDate,
    /// Kind of leave
    pub leave_type: LeaveType,
    /// Justification
    pub reason: String,
}

/// Outcome chosen by a reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaveDecision {
    /// Grant the leave
    Approve,
    /// Decline the leave
    Reject,
}

impl LeaveDecision {
    /// Status the decision moves the request to.
    #[must_use]
    pub const fn status(self) -> LeaveStatus {
        match self {
            Self::Approve => LeaveStatus::Approved,
            Self::Reject => LeaveStatus::Rejected,
        }
    }
}

/// Number of calendar days covered by an inclusive range.
#[must_use]
pub fn leave_days(start_date: NaiveDate, end_date: NaiveDate) -> i64 {
    (end_date - start_date).num_days() + 1
}

/// Files a PENDING leave request.
///
/// The date range is checked before the store is touched.
///
/// # Errors
/// * `InvalidDateRange` - `start_date` is after `end_date`
/// * `EmployeeNotFound` / `EmployeeInactive` - unknown or deactivated employee
#[instrument(skip(db, application))]
pub async fn apply_leave(
    db: &DatabaseConnection,
    employee_id: i64,
    application: LeaveApplication,
) -> Result<leave_request::Model> {
    if application.start_date > application.end_date {
        return Err(Error::InvalidDateRange {
            start: application.start_date,
            end: application.end_date,
        });
    }

    let txn = store::begin_serializable(db).await?;
    employee::require_active(&txn, employee_id).await?;

    let request = leave_request::ActiveModel {
        employee_id: Set(employee_id),
        start_date: Set(application.start_date),
        end_date: Set(application.end_date),
        leave_type: Set(application.leave_type),
        reason: Set(application.reason.trim().to_string()),
        status: Set(LeaveStatus::Pending),
        comment: Set(None),
        reviewed_by: Set(None),
        reviewed_at: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await
    .map_err(|e| employee::employee_fk_error(e, employee_id))?;
    txn.commit().await?;

    info!(
        leave_id = request.id,
        days = leave_days(request.start_date, request.end_date),
        "Leave requested"
    );
    Ok(request)
}

/// Approves or rejects a PENDING request.
///
/// # Errors
/// * `NotFound` - no request with that id; nothing is written
/// * `AlreadyReviewed` - the request is already APPROVED or REJECTED
#[instrument(skip(db, comment))]
pub async fn review_leave(
    db: &DatabaseConnection,
    leave_id: i64,
    reviewer_id: i64,
    decision: LeaveDecision,
    comment: Option<String>,
) -> Result<leave_request::Model> {
    let txn = store::begin_serializable(db).await?;

    let request = LeaveRequest::find_by_id(leave_id)
        .one(&txn)
        .await?
        .ok_or(Error::NotFound { leave_id })?;
    if request.status.is_terminal() {
        return Err(Error::AlreadyReviewed {
            leave_id,
            status: request.status.to_value(),
        });
    }

    let status = decision.status();
    let reviewed_at = Utc::now();
    let result = LeaveRequest::update_many()
        .col_expr(leave_request::Column::Status, Expr::value(status.to_value()))
        .col_expr(leave_request::Column::Comment, Expr::value(comment.clone()))
        .col_expr(leave_request::Column::ReviewedBy, Expr::value(reviewer_id))
        .col_expr(leave_request::Column::ReviewedAt, Expr::value(reviewed_at))
        .filter(leave_request::Column::Id.eq(leave_id))
        .filter(leave_request::Column::Status.eq(LeaveStatus::Pending))
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        let current = LeaveRequest::find_by_id(leave_id).one(&txn).await?;
        return Err(Error::AlreadyReviewed {
            leave_id,
            status: current.map_or_else(String::new, |r| r.status.to_value()),
        });
    }
    txn.commit().await?;

    info!(leave_id, reviewer_id, ?status, "Leave reviewed");
    Ok(leave_request::Model {
        status,
        comment,
        reviewed_by: Some(reviewer_id),
        reviewed_at: Some(reviewed_at),
        ..request
    })
}

/// Finds one request by id.
pub async fn get_leave(db: &DatabaseConnection, leave_id: i64) -> Result<Option<leave_request::Model>> {
    LeaveRequest::find_by_id(leave_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists requests, newest first; `None` lists every employee's requests.
pub async fn list_leaves(
    db: &DatabaseConnection,
    employee_id: Option<i64>,
) -> Result<Vec<leave_request::Model>> {
    let mut query = LeaveRequest::find();
    if let Some(employee_id) = employee_id {
        query = query.filter(leave_request::Column::EmployeeId.eq(employee_id));
    }
    query
        .order_by_desc(leave_request::Column::CreatedAt)
        .order_by_desc(leave_request::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}
