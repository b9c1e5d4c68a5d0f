//! Shared test utilities for the workforce ledger.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test employees and salary structures with sensible defaults.

use crate::{
    config::{StoreSettings, database},
    core::{
        employee::{EmployeeRecord, NewEmployee},
        identifier,
        salary::{self, BASIC, Basis, Component, Structure},
    },
    entities::Role,
    errors::Result,
};
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use rust_decimal_macros::dec;
use sea_orm::{ConnectOptions, DatabaseConnection};
use std::sync::Arc;
use tempfile::TempDir;

/// Installs a test-writer tracing subscriber once; later calls are no-ops.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized.
///
/// The pool holds a single connection: every pooled connection to
/// `sqlite::memory:` would otherwise open its own empty database. Concurrent
/// callers queue on that connection, which serialises their transactions.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    init_test_tracing();
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = sea_orm::Database::connect(options).await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a file-backed `SQLite` database pooled over `max_connections`.
///
/// Unlike [`setup_test_db`], connections here really run side by side, so
/// concurrent writers contend for the file lock. Keep the returned directory
/// alive for as long as the database is used.
pub async fn setup_file_db(max_connections: u32) -> Result<(TempDir, Arc<DatabaseConnection>)> {
    setup_file_db_with_busy_timeout(max_connections, StoreSettings::default().busy_timeout_secs)
        .await
}

/// Like [`setup_file_db`] with an explicit lock wait; `0` fails fast.
pub async fn setup_file_db_with_busy_timeout(
    max_connections: u32,
    busy_timeout_secs: u64,
) -> Result<(TempDir, Arc<DatabaseConnection>)> {
    init_test_tracing();
    let dir = TempDir::new()?;
    let url = format!(
        "sqlite://{}?mode=rwc",
        dir.path().join("workforce.sqlite").display()
    );
    let store = StoreSettings {
        max_connections,
        busy_timeout_secs,
        ..StoreSettings::default()
    };
    let db = database::init_db(&url, &store).await?;
    Ok((dir, Arc::new(db)))
}

/// Builds a provisioning request.
///
/// # Defaults
/// * `role`: `EMPLOYEE`
/// * `department`: "Engineering", `designation`: "Developer"
/// * `joining_date`: 2026-01-01
pub fn new_employee(first_name: &str, last_name: &str, email: &str) -> NewEmployee {
    NewEmployee {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: email.to_string(),
        role: Role::Employee,
        phone: None,
        department: Some("Engineering".to_string()),
        designation: Some("Developer".to_string()),
        joining_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap_or_default(),
    }
}

/// Provisions an employee with company code `OI` in 2026.
///
/// The email is derived from the names, e.g. `jane.doe@co`.
pub async fn create_test_employee(
    db: &DatabaseConnection,
    first_name: &str,
    last_name: &str,
) -> Result<EmployeeRecord> {
    let email = format!(
        "{}.{}@co",
        first_name.to_lowercase(),
        last_name.to_lowercase()
    );
    identifier::allocate_employee_code(
        db,
        "OI",
        &new_employee(first_name, last_name, &email),
        2026,
        3,
    )
    .await
}

/// Basic 50% of wage, HRA 50% of Basic, fixed Standard Allowance 4167.
pub fn standard_components() -> Vec<Component> {
    vec![
        Component::earning(BASIC, Basis::PercentOfWage { percent: dec!(50) }),
        Component::earning(
            "HRA",
            Basis::PercentOfComponent {
                component: BASIC.to_string(),
                percent: dec!(50),
            },
        ),
        Component::earning("Standard Allowance", Basis::Fixed { amount: dec!(4167) }),
    ]
}

/// Saves [`standard_components`] on a wage of 50000.
pub async fn create_test_structure(db: &DatabaseConnection, employee_id: i64) -> Result<Structure> {
    salary::upsert_salary_structure(db, employee_id, dec!(50000), standard_components()).await
}

/// The instant of `hour:minute` server-local time on `date`.
pub fn local_instant(date: NaiveDate, hour: u32, minute: u32) -> DateTime<Utc> {
    let naive = date.and_hms_opt(hour, minute, 0).unwrap_or_default();
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map_or_else(|| naive.and_utc(), |local| local.with_timezone(&Utc))
}
