//! Report business logic - Read-only rollups over the ledger.
//!
//! Nothing here writes; every figure is a `GROUP BY` or a sum over rows the
//! other components own.

use crate::{
    core::payroll,
    entities::{
        AttendanceRecord, AttendanceStatus, Employee, LeaveRequest, LeaveStatus, PayrollRecord,
        attendance_record, employee, leave_request, payroll_record,
    },
    errors::Result,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{QuerySelect, prelude::*, sea_query::Expr};
use serde::Serialize;

/// Attendance rows per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceSummary {
    /// PRESENT rows
    pub present: u64,
    /// ABSENT rows
    pub absent: u64,
    /// HALF_DAY rows
    pub half_day: u64,
    /// ON_LEAVE rows
    pub on_leave: u64,
}

/// Leave requests per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LeaveSummary {
    /// Awaiting review
    pub pending: u64,
    /// Approved
    pub approved: u64,
    /// Rejected
    pub rejected: u64,
}

/// Totals of one payroll month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayrollSummary {
    /// `YYYY-MM`
    pub month: String,
    /// Records in the month
    pub processed: usize,
    /// Sum of net salaries
    pub total_payout: Decimal,
}

/// Headline figures for one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    /// Active employees
    pub active_employees: u64,
    /// Employees who checked in on the day
    pub present: u64,
    /// Leave requests awaiting review
    pub pending_leaves: u64,
}

fn to_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

/// Counts attendance rows by status, optionally for a single date.
pub async fn attendance_summary(
    db: &DatabaseConnection,
    date: Option<NaiveDate>,
) -> Result<AttendanceSummary> {
    let mut query = AttendanceRecord::find()
        .select_only()
        .column(attendance_record::Column::Status)
        .column_as(Expr::col(attendance_record::Column::Id).count(), "count")
        .group_by(attendance_record::Column::Status);
    if let Some(date) = date {
        query = query.filter(attendance_record::Column::Date.eq(date));
    }
    let rows: Vec<(AttendanceStatus, i64)> = query.into_tuple().all(db).await?;

    let mut summary = AttendanceSummary::default();
    for (status, n) in rows {
        let slot = match status {
            AttendanceStatus::Present => &mut summary.present,
            AttendanceStatus::Absent => &mut summary.absent,
            AttendanceStatus::HalfDay => &mut summary.half_day,
            AttendanceStatus::OnLeave => &mut summary.on_leave,
        };
        *slot = to_count(n);
    }
    Ok(summary)
}

/// Counts leave requests by status.
pub async fn leave_summary(db: &DatabaseConnection) -> Result<LeaveSummary> {
    let rows: Vec<(LeaveStatus, i64)> = LeaveRequest::find()
        .select_only()
        .column(leave_request::Column::Status)
        .column_as(Expr::col(leave_request::Column::Id).count(), "count")
        .group_by(leave_request::Column::Status)
        .into_tuple()
        .all(db)
        .await?;

    let mut summary = LeaveSummary::default();
    for (status, n) in rows {
        match status {
            LeaveStatus::Pending => summary.pending = to_count(n),
            LeaveStatus::Approved => summary.approved = to_count(n),
            LeaveStatus::Rejected => summary.rejected = to_count(n),
        }
    }
    Ok(summary)
}

/// Sums the net salaries of a payroll month.
///
/// Amounts are stored as text, so the sum is taken in `Decimal` rather than
/// in SQL.
pub async fn payroll_summary(db: &DatabaseConnection, month: &str) -> Result<PayrollSummary> {
    let month = payroll::validate_month(month)?;
    let records = PayrollRecord::find()
        .filter(payroll_record::Column::Month.eq(month.as_str()))
        .all(db)
        .await?;

    let total_payout = records
        .iter()
        .map(|r| r.net_salary.value())
        .sum::<Decimal>();
    Ok(PayrollSummary {
        month,
        processed: records.len(),
        total_payout,
    })
}

/// Headcount, attendance and pending leave for `date`.
pub async fn dashboard_stats(db: &DatabaseConnection, date: NaiveDate) -> Result<DashboardStats> {
    let active_employees = Employee::find()
        .filter(employee::Column::IsActive.eq(true))
        .count(db)
        .await?;
    let present = AttendanceRecord::find()
        .filter(attendance_record::Column::Date.eq(date))
        .filter(attendance_record::Column::CheckIn.is_not_null())
        .count(db)
        .await?;
    let pending_leaves = LeaveRequest::find()
        .filter(leave_request::Column::Status.eq(LeaveStatus::Pending))
        .count(db)
        .await?;

    Ok(DashboardStats {
        active_employees,
        present,
        pending_leaves,
    })
}
