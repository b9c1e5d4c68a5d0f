//! The ledger facade handed to callers.
//!
//! `Workforce` owns the database handle and settings; it is built once and
//! passed wherever ledger operations are needed. Every call is bounded by
//! `store.operation_timeout_secs`. On expiry the in-flight future is dropped,
//! which rolls back any open transaction, and `Error::Timeout` is returned.

use crate::{
    config::{Settings, database},
    core::{
        access::Principal,
        attendance,
        employee::{self, EmployeeRecord, NewEmployee, ProfileUpdate},
        identifier,
        leave::{self, LeaveApplication, LeaveDecision},
        payroll::{self, PayrollRun},
        report::{self, AttendanceSummary, DashboardStats, LeaveSummary, PayrollSummary},
        salary::{self, Component, Structure},
    },
    entities::{
        AttendanceModel, EmployeeModel, EmployeeProfileModel, LeaveRequestModel,
        PayrollRecordModel,
    },
    errors::{Error, Result},
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use std::future::Future;
use tracing::warn;

/// Ledger operations over an injected store handle.
///
/// Share one instance behind an `Arc` rather than cloning it.
#[derive(Debug)]
pub struct Workforce {
    db: DatabaseConnection,
    settings: Settings,
}

impl Workforce {
    /// Wraps an existing connection.
    #[must_use]
    pub const fn new(db: DatabaseConnection, settings: Settings) -> Self {
        Self { db, settings }
    }

    /// Connects to `database_url`, ensures the schema and wraps the pool.
    pub async fn connect(database_url: &str, settings: Settings) -> Result<Self> {
        let db = database::init_db(database_url, &settings.store).await?;
        Ok(Self::new(db, settings))
    }

    /// The underlying connection.
    #[must_use]
    pub const fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Active settings.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    async fn bounded<T, F>(&self, operation: &'static str, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let limit = self.settings.store.operation_timeout();
        tokio::time::timeout(limit, future).await.unwrap_or_else(|_| {
            warn!(operation, ?limit, "Ledger operation timed out");
            Err(Error::Timeout {
                message: format!("{operation} did not finish within {limit:?}"),
            })
        })
    }

    // --- employees ---

    /// Allocates a code for `year` and provisions the employee under it.
    pub async fn allocate_employee_code(
        &self,
        new_employee: &NewEmployee,
        year: i32,
    ) -> Result<EmployeeRecord> {
        self.bounded(
            "allocate_employee_code",
            identifier::allocate_employee_code(
                &self.db,
                &self.settings.company.code,
                new_employee,
                year,
                self.settings.allocation.max_attempts,
            ),
        )
        .await
    }

    /// Provisions an employee under the current year's next code.
    pub async fn provision_employee(&self, new_employee: &NewEmployee) -> Result<EmployeeRecord> {
        self.bounded(
            "provision_employee",
            employee::provision_employee(
                &self.db,
                &self.settings.company.code,
                new_employee,
                self.settings.allocation.max_attempts,
            ),
        )
        .await
    }

    /// Finds an employee with their profile.
    pub async fn get_employee(&self, employee_id: i64) -> Result<Option<EmployeeRecord>> {
        self.bounded("get_employee", employee::get_employee(&self.db, employee_id))
            .await
    }

    /// Lists employees, optionally only active ones.
    pub async fn list_employees(&self, active_only: bool) -> Result<Vec<EmployeeModel>> {
        self.bounded("list_employees", employee::list_employees(&self.db, active_only))
            .await
    }

    /// Partially updates a profile.
    pub async fn update_profile(
        &self,
        employee_id: i64,
        update: ProfileUpdate,
    ) -> Result<EmployeeProfileModel> {
        self.bounded(
            "update_profile",
            employee::update_profile(&self.db, employee_id, update),
        )
        .await
    }

    /// Soft-deletes an employee.
    pub async fn deactivate_employee(&self, employee_id: i64) -> Result<EmployeeModel> {
        self.bounded(
            "deactivate_employee",
            employee::deactivate_employee(&self.db, employee_id),
        )
        .await
    }

    // --- attendance ---

    /// Checks in for today.
    pub async fn check_in(&self, employee_id: i64) -> Result<AttendanceModel> {
        self.bounded("check_in", attendance::check_in(&self.db, employee_id))
            .await
    }

    /// Checks out for today.
    pub async fn check_out(&self, employee_id: i64) -> Result<AttendanceModel> {
        let threshold = self.settings.attendance.half_day_threshold();
        self.bounded(
            "check_out",
            attendance::check_out(&self.db, employee_id, threshold),
        )
        .await
    }

    /// Unscoped attendance query.
    pub async fn get_attendance(
        &self,
        employee_id: Option<i64>,
        date: Option<NaiveDate>,
    ) -> Result<Vec<AttendanceModel>> {
        self.bounded(
            "get_attendance",
            attendance::get_attendance(&self.db, employee_id, date),
        )
        .await
    }

    /// Attendance the principal may see.
    pub async fn attendance_visible_to(
        &self,
        principal: &Principal,
        employee_id: Option<i64>,
        date: Option<NaiveDate>,
    ) -> Result<Vec<AttendanceModel>> {
        let employee_id = principal.scope(employee_id, "attendance")?;
        self.get_attendance(employee_id, date).await
    }

    // --- leave ---

    /// Files a leave request for the employee.
    pub async fn apply_leave(
        &self,
        employee_id: i64,
        application: LeaveApplication,
    ) -> Result<LeaveRequestModel> {
        self.bounded(
            "apply_leave",
            leave::apply_leave(&self.db, employee_id, application),
        )
        .await
    }

    /// Reviews a request; only Admin and HR may review.
    pub async fn review_leave(
        &self,
        reviewer: &Principal,
        leave_id: i64,
        decision: LeaveDecision,
        comment: Option<String>,
    ) -> Result<LeaveRequestModel> {
        reviewer.require_privileged("review leave")?;
        self.bounded(
            "review_leave",
            leave::review_leave(&self.db, leave_id, reviewer.employee_id, decision, comment),
        )
        .await
    }

    /// Finds one request.
    pub async fn get_leave(&self, leave_id: i64) -> Result<Option<LeaveRequestModel>> {
        self.bounded("get_leave", leave::get_leave(&self.db, leave_id))
            .await
    }

    /// Unscoped leave listing.
    pub async fn list_leaves(&self, employee_id: Option<i64>) -> Result<Vec<LeaveRequestModel>> {
        self.bounded("list_leaves", leave::list_leaves(&self.db, employee_id))
            .await
    }

    /// Leave requests the principal may see.
    pub async fn leaves_visible_to(
        &self,
        principal: &Principal,
        employee_id: Option<i64>,
    ) -> Result<Vec<LeaveRequestModel>> {
        let employee_id = principal.scope(employee_id, "leave requests")?;
        self.list_leaves(employee_id).await
    }

    // --- salary and payroll ---

    /// Replaces an employee's salary structure.
    pub async fn upsert_salary_structure(
        &self,
        employee_id: i64,
        wage: Decimal,
        components: Vec<Component>,
    ) -> Result<Structure> {
        self.bounded(
            "upsert_salary_structure",
            salary::upsert_salary_structure(&self.db, employee_id, wage, components),
        )
        .await
    }

    /// Current salary structure, if any.
    pub async fn get_salary_structure(&self, employee_id: i64) -> Result<Option<Structure>> {
        self.bounded(
            "get_salary_structure",
            salary::get_salary_structure(&self.db, employee_id),
        )
        .await
    }

    /// Runs the payroll batch for `month` (`YYYY-MM`).
    pub async fn generate_payroll(&self, month: &str) -> Result<PayrollRun> {
        self.bounded("generate_payroll", payroll::generate_payroll(&self.db, month))
            .await
    }

    /// Unscoped payroll listing.
    pub async fn get_payroll(
        &self,
        employee_id: Option<i64>,
        month: Option<&str>,
    ) -> Result<Vec<PayrollRecordModel>> {
        self.bounded(
            "get_payroll",
            payroll::get_payroll(&self.db, employee_id, month),
        )
        .await
    }

    /// Payroll records the principal may see.
    pub async fn payroll_visible_to(
        &self,
        principal: &Principal,
        employee_id: Option<i64>,
        month: Option<&str>,
    ) -> Result<Vec<PayrollRecordModel>> {
        let employee_id = principal.scope(employee_id, "payroll")?;
        self.get_payroll(employee_id, month).await
    }

    // --- reports ---

    /// Attendance counts by status.
    pub async fn attendance_summary(&self, date: Option<NaiveDate>) -> Result<AttendanceSummary> {
        self.bounded(
            "attendance_summary",
            report::attendance_summary(&self.db, date),
        )
        .await
    }

    /// Leave counts by status.
    pub async fn leave_summary(&self) -> Result<LeaveSummary> {
        self.bounded("leave_summary", report::leave_summary(&self.db))
            .await
    }

    /// Totals of a payroll month.
    pub async fn payroll_summary(&self, month: &str) -> Result<PayrollSummary> {
        self.bounded("payroll_summary", report::payroll_summary(&self.db, month))
            .await
    }

    /// Headline figures for `date`.
    pub async fn dashboard_stats(&self, date: NaiveDate) -> Result<DashboardStats> {
        self.bounded("dashboard_stats", report::dashboard_stats(&self.db, date))
            .await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::config::StoreSettings;
    use crate::entities::{LeaveStatus, LeaveType, Role};
    use crate::test_utils::*;
    use rust_decimal_macros::dec;
    use sea_orm::TransactionTrait;

    async fn workforce() -> Result<Workforce> {
        let db = setup_test_db().await?;
        let settings = Settings {
            store: StoreSettings {
                operation_timeout_secs: 1,
                ..StoreSettings::default()
            },
            ..Settings::default()
        };
        Ok(Workforce::new(db, settings))
    }

    #[tokio::test]
    async fn test_provision_check_in_and_out() -> Result<()> {
        let workforce = workforce().await?;
        let jane = workforce
            .provision_employee(&new_employee("Jane", "Doe", "jane@co"))
            .await?;
        assert!(jane.employee.employee_code.starts_with("ODJADO"));

        workforce.check_in(jane.employee.id).await?;
        let again = workforce.check_in(jane.employee.id).await;
        assert!(matches!(again, Err(Error::AlreadyCheckedIn { .. })));

        let closed = workforce.check_out(jane.employee.id).await?;
        assert!(closed.check_out.is_some());
        assert!(matches!(
            workforce.check_out(jane.employee.id).await,
            Err(Error::AlreadyCheckedOut { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_scoped_reads() -> Result<()> {
        let workforce = workforce().await?;
        let jane = workforce
            .allocate_employee_code(&new_employee("Jane", "Doe", "jane@co"), 2026)
            .await?;
        let john = workforce
            .allocate_employee_code(&new_employee("John", "Smith", "john@co"), 2026)
            .await?;
        let application = LeaveApplication {
            start_date: NaiveDate::from_ymd_opt(2026, 3, 5).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 3, 6).unwrap(),
            leave_type: LeaveType::Paid,
            reason: "Trip".to_string(),
        };
        workforce.apply_leave(jane.employee.id, application.clone()).await?;
        workforce.apply_leave(john.employee.id, application).await?;

        let as_jane = Principal::new(jane.employee.id, Role::Employee);
        let own = workforce.leaves_visible_to(&as_jane, None).await?;
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].employee_id, jane.employee.id);
        assert!(matches!(
            workforce.leaves_visible_to(&as_jane, Some(john.employee.id)).await,
            Err(Error::Forbidden { .. })
        ));
        assert!(matches!(
            workforce.payroll_visible_to(&as_jane, Some(john.employee.id), None).await,
            Err(Error::Forbidden { .. })
        ));

        let as_hr = Principal::new(john.employee.id, Role::Hr);
        assert_eq!(workforce.leaves_visible_to(&as_hr, None).await?.len(), 2);
        assert!(workforce.attendance_visible_to(&as_hr, None, None).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_only_privileged_principals_review() -> Result<()> {
        let workforce = workforce().await?;
        let jane = workforce
            .allocate_employee_code(&new_employee("Jane", "Doe", "jane@co"), 2026)
            .await?;
        let request = workforce
            .apply_leave(
                jane.employee.id,
                LeaveApplication {
                    start_date: NaiveDate::from_ymd_opt(2026, 3, 5).unwrap(),
                    end_date: NaiveDate::from_ymd_opt(2026, 3, 5).unwrap(),
                    leave_type: LeaveType::Sick,
                    reason: "Flu".to_string(),
                },
            )
            .await?;

        let as_jane = Principal::new(jane.employee.id, Role::Employee);
        let denied = workforce
            .review_leave(&as_jane, request.id, LeaveDecision::Approve, None)
            .await;
        assert!(matches!(denied, Err(Error::Forbidden { .. })));

        let as_admin = Principal::new(99, Role::Admin);
        let approved = workforce
            .review_leave(&as_admin, request.id, LeaveDecision::Approve, None)
            .await?;
        assert_eq!(approved.status, LeaveStatus::Approved);
        assert_eq!(approved.reviewed_by, Some(99));
        Ok(())
    }

    #[tokio::test]
    async fn test_payroll_through_facade() -> Result<()> {
        let workforce = workforce().await?;
        let jane = workforce
            .allocate_employee_code(&new_employee("Jane", "Doe", "jane@co"), 2026)
            .await?;
        workforce
            .upsert_salary_structure(jane.employee.id, dec!(50000), standard_components())
            .await?;

        let run = workforce.generate_payroll("2026-01").await?;
        assert_eq!(run.records[0].basic_salary.to_string(), "25000.00");
        let rerun = workforce.generate_payroll("2026-01").await?;
        assert_eq!(rerun.records, run.records);

        let summary = workforce.payroll_summary("2026-01").await?;
        assert_eq!(summary.total_payout, dec!(41667.00));
        Ok(())
    }

    #[tokio::test]
    async fn test_timeout_is_retryable_and_applies_nothing() -> Result<()> {
        let workforce = workforce().await?;
        let jane = workforce
            .allocate_employee_code(&new_employee("Jane", "Doe", "jane@co"), 2026)
            .await?;

        // Hold the only pooled connection so the next call cannot start
        let blocker = workforce.db().begin().await?;
        let result = workforce.check_in(jane.employee.id).await;
        assert!(matches!(result, Err(ref e) if e.is_retryable()));
        assert!(matches!(result, Err(Error::Timeout { .. })));
        blocker.rollback().await?;

        assert!(workforce.get_attendance(Some(jane.employee.id), None).await?.is_empty());
        workforce.check_in(jane.employee.id).await?;
        Ok(())
    }
}
