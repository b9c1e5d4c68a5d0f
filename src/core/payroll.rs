//! Payroll business logic - Monthly net pay derived from salary structures.
//!
//! A run covers every active employee with a salary structure and upserts one
//! record per (employee, month) inside a single transaction, so readers see
//! either the previous month state or the complete new one. Rows whose amounts
//! did not change are left alone, which keeps reruns byte-identical.

use crate::{
    core::{salary, store},
    entities::{DecimalText, Employee, PayrollRecord, employee, payroll_record},
    errors::{Error, Result},
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::OnConflict};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

/// Outcome of one payroll run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayrollRun {
    /// Month generated, `YYYY-MM`
    pub month: String,
    /// One record per paid employee, ordered by employee id
    pub records: Vec<payroll_record::Model>,
    /// Active employees skipped because they have no salary structure
    pub skipped_without_structure: Vec<i64>,
    /// Records that already held the computed amounts and were not rewritten
    pub unchanged: usize,
}

impl PayrollRun {
    /// Number of employees left out for lack of a structure.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.skipped_without_structure.len()
    }
}

/// Checks that `month` is `YYYY-MM` with a real month, returning it trimmed.
pub fn validate_month(month: &str) -> Result<String> {
    let trimmed = month.trim();
    let well_formed = trimmed.len() == 7
        && trimmed.as_bytes()[4] == b'-'
        && trimmed
            .bytes()
            .enumerate()
            .all(|(i, b)| i == 4 || b.is_ascii_digit())
        && NaiveDate::parse_from_str(&format!("{trimmed}-01"), "%Y-%m-%d").is_ok();
    if well_formed {
        Ok(trimmed.to_string())
    } else {
        Err(Error::InvalidMonth {
            month: month.to_string(),
        })
    }
}

fn same_amounts(record: &payroll_record::Model, breakdown: &salary::Breakdown) -> bool {
    record.basic_salary.value() == breakdown.basic
        && record.total_allowances.value() == breakdown.allowances
        && record.total_deductions.value() == breakdown.deductions
        && record.net_salary.value() == breakdown.net
}

async fn upsert_record<C>(
    db: &C,
    employee_id: i64,
    month: &str,
    breakdown: &salary::Breakdown,
    at: DateTime<Utc>,
) -> Result<payroll_record::Model>
where
    C: ConnectionTrait,
{
    PayrollRecord::insert(payroll_record::ActiveModel {
        employee_id: Set(employee_id),
        month: Set(month.to_string()),
        basic_salary: Set(DecimalText::from(breakdown.basic)),
        total_allowances: Set(DecimalText::from(breakdown.allowances)),
        total_deductions: Set(DecimalText::from(breakdown.deductions)),
        net_salary: Set(DecimalText::from(breakdown.net)),
        generated_at: Set(at),
        ..Default::default()
    })
    .on_conflict(
        OnConflict::columns([
            payroll_record::Column::EmployeeId,
            payroll_record::Column::Month,
        ])
        .update_columns([
            payroll_record::Column::BasicSalary,
            payroll_record::Column::TotalAllowances,
            payroll_record::Column::TotalDeductions,
            payroll_record::Column::NetSalary,
            payroll_record::Column::GeneratedAt,
        ])
        .to_owned(),
    )
    .exec_without_returning(db)
    .await?;

    PayrollRecord::find()
        .filter(payroll_record::Column::EmployeeId.eq(employee_id))
        .filter(payroll_record::Column::Month.eq(month))
        .one(db)
        .await?
        .ok_or_else(|| Error::Store {
            message: format!("payroll row for employee {employee_id} vanished after upsert"),
        })
}

async fn run_batch<C>(db: &C, month: &str, at: DateTime<Utc>) -> Result<PayrollRun>
where
    C: ConnectionTrait,
{
    let employees = Employee::find()
        .filter(employee::Column::IsActive.eq(true))
        .order_by_asc(employee::Column::Id)
        .all(db)
        .await?;
    let mut structures = salary::all_structures(db).await?;
    let existing: HashMap<i64, payroll_record::Model> = PayrollRecord::find()
        .filter(payroll_record::Column::Month.eq(month))
        .all(db)
        .await?
        .into_iter()
        .map(|record| (record.employee_id, record))
        .collect();

    let mut run = PayrollRun {
        month: month.to_string(),
        records: Vec::with_capacity(employees.len()),
        skipped_without_structure: Vec::new(),
        unchanged: 0,
    };

    for employee in employees {
        let Some(structure) = structures.remove(&employee.id) else {
            debug!(employee_id = employee.id, "No salary structure, skipping");
            run.skipped_without_structure.push(employee.id);
            continue;
        };
        let breakdown = structure.breakdown()?;

        if let Some(current) = existing
            .get(&employee.id)
            .filter(|current| same_amounts(current, &breakdown))
        {
            run.records.push(current.clone());
            run.unchanged += 1;
            continue;
        }

        let record = upsert_record(db, employee.id, month, &breakdown, at).await?;
        run.records.push(record);
    }

    Ok(run)
}

fn batch_failure(month: &str, err: Error) -> Error {
    match err {
        Error::Timeout { .. } | Error::StoreUnavailable { .. } => err,
        other => Error::PayrollGenerationFailed {
            month: month.to_string(),
            message: other.to_string(),
        },
    }
}

/// Generates payroll for `month` now.
pub async fn generate_payroll(db: &DatabaseConnection, month: &str) -> Result<PayrollRun> {
    generate_payroll_at(db, month, Utc::now()).await
}

/// Generates payroll for `month`, stamping written rows with `at`.
///
/// # Errors
/// * `InvalidMonth` - `month` is not `YYYY-MM`; checked before the store
/// * `Timeout` / `StoreUnavailable` - infrastructure fault, nothing written
/// * `PayrollGenerationFailed` - any other failure; the batch is rolled back
#[instrument(skip(db))]
pub async fn generate_payroll_at(
    db: &DatabaseConnection,
    month: &str,
    at: DateTime<Utc>,
) -> Result<PayrollRun> {
    let month = validate_month(month)?;
    let txn = store::begin_serializable(db)
        .await
        .map_err(|e| batch_failure(&month, e.into()))?;

    let run = match run_batch(&txn, &month, at).await {
        Ok(run) => run,
        Err(e) => {
            warn!(%month, error = %e, "Payroll run aborted, rolling back");
            txn.rollback()
                .await
                .map_err(|e| batch_failure(&month, e.into()))?;
            return Err(batch_failure(&month, e));
        }
    };
    txn.commit()
        .await
        .map_err(|e| batch_failure(&month, e.into()))?;

    info!(
        %month,
        paid = run.records.len(),
        unchanged = run.unchanged,
        skipped = run.skipped_count(),
        "Payroll generated"
    );
    Ok(run)
}

/// Lists payroll records, newest month first, then by employee.
pub async fn get_payroll(
    db: &DatabaseConnection,
    employee_id: Option<i64>,
    month: Option<&str>,
) -> Result<Vec<payroll_record::Model>> {
    let mut query = PayrollRecord::find();
    if let Some(employee_id) = employee_id {
        query = query.filter(payroll_record::Column::EmployeeId.eq(employee_id));
    }
    if let Some(month) = month {
        query = query.filter(payroll_record::Column::Month.eq(validate_month(month)?));
    }
    query
        .order_by_desc(payroll_record::Column::Month)
        .order_by_asc(payroll_record::Column::EmployeeId)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{
        employee::deactivate_employee,
        salary::{BASIC, Basis, Component, upsert_salary_structure},
    };
    use crate::entities::{SalaryComponent, salary_component};
    use crate::test_utils::*;
    use chrono::{Duration, TimeZone};
    use sea_orm::sea_query::Expr;
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[test]
    fn test_validate_month() {
        assert_eq!(validate_month("2026-01").unwrap(), "2026-01");
        assert_eq!(validate_month(" 2026-12 ").unwrap(), "2026-12");
        for bad in ["2026-13", "2026-00", "2026-1", "202601", "26-01-01", "2026/01", "", "abcd-ef"] {
            assert!(
                matches!(validate_month(bad), Err(Error::InvalidMonth { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_invalid_month_fails_before_store() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();
        let result = generate_payroll(&db, "2026-13").await;
        assert!(matches!(result, Err(Error::InvalidMonth { .. })));
        assert!(db.into_transaction_log().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_standard_payroll_and_byte_identical_rerun() -> Result<()> {
        let db = setup_test_db().await?;
        let jane = create_test_employee(&db, "Jane", "Doe").await?;
        create_test_structure(&db, jane.employee.id).await?;

        let first_at = Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap();
        let first = generate_payroll_at(&db, "2026-01", first_at).await?;
        assert_eq!(first.records.len(), 1);
        assert_eq!(first.unchanged, 0);
        let record = &first.records[0];
        assert_eq!(record.basic_salary.to_string(), "25000.00");
        assert_eq!(record.total_allowances.to_string(), "16667.00");
        assert_eq!(record.total_deductions.to_string(), "0.00");
        assert_eq!(record.net_salary.to_string(), "41667.00");

        let second = generate_payroll_at(&db, "2026-01", first_at + Duration::hours(1)).await?;
        assert_eq!(second.unchanged, 1);
        assert_eq!(second.records, first.records);

        let stored = get_payroll(&db, None, Some("2026-01")).await?;
        assert_eq!(stored, first.records);
        Ok(())
    }

    #[tokio::test]
    async fn test_changed_structure_overwrites_row() -> Result<()> {
        let db = setup_test_db().await?;
        let jane = create_test_employee(&db, "Jane", "Doe").await?;
        let id = jane.employee.id;
        create_test_structure(&db, id).await?;

        let first_at = Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap();
        let first = generate_payroll_at(&db, "2026-01", first_at).await?;

        let raise = vec![
            Component::earning(BASIC, Basis::Fixed { amount: dec!(30000) }),
            Component::deduction("PF", Basis::PercentOfComponent {
                component: BASIC.to_string(),
                percent: dec!(12),
            }),
        ];
        upsert_salary_structure(&db, id, dec!(30000), raise).await?;

        let later = first_at + Duration::hours(1);
        let second = generate_payroll_at(&db, "2026-01", later).await?;
        assert_eq!(second.unchanged, 0);

        let stored = get_payroll(&db, Some(id), None).await?;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, first.records[0].id);
        assert_eq!(stored[0].net_salary.to_string(), "26400.00");
        assert_eq!(stored[0].generated_at, later);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_batch_rolls_back_earlier_rows() -> Result<()> {
        let db = setup_test_db().await?;
        let jane = create_test_employee(&db, "Jane", "Doe").await?;
        let john = create_test_employee(&db, "John", "Smith").await?;
        create_test_structure(&db, jane.employee.id).await?;
        create_test_structure(&db, john.employee.id).await?;

        let first_at = Utc.with_ymd_and_hms(2026, 2, 1, 9, 0, 0).unwrap();
        let first = generate_payroll_at(&db, "2026-01", first_at).await?;
        assert_eq!(first.records.len(), 2);

        // Jane's new pay would be written first, then John's structure fails to resolve
        let raise = vec![Component::earning(BASIC, Basis::Fixed { amount: dec!(30000) })];
        upsert_salary_structure(&db, jane.employee.id, dec!(30000), raise).await?;
        SalaryComponent::update_many()
            .col_expr(salary_component::Column::BaseComponent, Expr::value("Missing"))
            .filter(salary_component::Column::EmployeeId.eq(john.employee.id))
            .filter(salary_component::Column::Name.eq("HRA"))
            .exec(&db)
            .await?;

        let later = first_at + Duration::hours(1);
        let rerun = generate_payroll_at(&db, "2026-01", later).await;
        assert!(matches!(
            rerun,
            Err(Error::PayrollGenerationFailed { ref month, .. }) if month == "2026-01"
        ));
        assert_eq!(get_payroll(&db, None, Some("2026-01")).await?, first.records);

        let fresh = generate_payroll_at(&db, "2026-02", later).await;
        assert!(matches!(fresh, Err(Error::PayrollGenerationFailed { .. })));
        assert!(get_payroll(&db, Some(jane.employee.id), Some("2026-02")).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_employees_without_structure_are_skipped() -> Result<()> {
        let db = setup_test_db().await?;
        let jane = create_test_employee(&db, "Jane", "Doe").await?;
        let john = create_test_employee(&db, "John", "Smith").await?;
        create_test_structure(&db, jane.employee.id).await?;

        let run = generate_payroll(&db, "2026-02").await?;
        assert_eq!(run.records.len(), 1);
        assert_eq!(run.skipped_count(), 1);
        assert_eq!(run.skipped_without_structure, vec![john.employee.id]);
        Ok(())
    }

    #[tokio::test]
    async fn test_inactive_employees_are_not_paid() -> Result<()> {
        let db = setup_test_db().await?;
        let jane = create_test_employee(&db, "Jane", "Doe").await?;
        let id = jane.employee.id;
        create_test_structure(&db, id).await?;

        generate_payroll(&db, "2026-01").await?;
        deactivate_employee(&db, id).await?;

        let run = generate_payroll(&db, "2026-02").await?;
        assert!(run.records.is_empty());
        assert!(run.skipped_without_structure.is_empty());

        // Earlier months are history and stay in place
        let january = generate_payroll(&db, "2026-01").await?;
        assert!(january.records.is_empty());
        assert_eq!(get_payroll(&db, Some(id), Some("2026-01")).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_get_payroll_orders_by_month_then_employee() -> Result<()> {
        let db = setup_test_db().await?;
        let jane = create_test_employee(&db, "Jane", "Doe").await?;
        let john = create_test_employee(&db, "John", "Smith").await?;
        create_test_structure(&db, jane.employee.id).await?;
        create_test_structure(&db, john.employee.id).await?;

        generate_payroll(&db, "2026-01").await?;
        generate_payroll(&db, "2026-02").await?;

        let all = get_payroll(&db, None, None).await?;
        let keys: Vec<(String, i64)> = all
            .iter()
            .map(|r| (r.month.clone(), r.employee_id))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("2026-02".to_string(), jane.employee.id),
                ("2026-02".to_string(), john.employee.id),
                ("2026-01".to_string(), jane.employee.id),
                ("2026-01".to_string(), john.employee.id),
            ]
        );

        assert!(matches!(
            get_payroll(&db, None, Some("January")).await,
            Err(Error::InvalidMonth { .. })
        ));
        Ok(())
    }
}
