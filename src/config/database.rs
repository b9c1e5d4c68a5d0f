//! Database configuration module for the workforce ledger.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs. The composite uniqueness rules the
//! ledger relies on, one attendance row per (employee, date), one payroll row per
//! (employee, month) and one component name per structure, cannot be expressed on
//! the entity and are created here as unique indexes.

use crate::config::StoreSettings;
use crate::entities::{
    AttendanceRecord, Employee, EmployeeProfile, LeaveRequest, PayrollRecord, SalaryComponent,
    SalaryStructure, attendance_record, payroll_record, salary_component,
};
use crate::errors::Result;
use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema,
};
use tracing::{debug, info, instrument};

/// Default database location when `DATABASE_URL` is not set
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/workforce.sqlite?mode=rwc";

/// Unique index name for (employee, date) attendance rows
pub const ATTENDANCE_DAY_INDEX: &str = "idx_attendance_employee_date";
/// Unique index name for (employee, month) payroll rows
pub const PAYROLL_MONTH_INDEX: &str = "idx_payroll_employee_month";
/// Unique index name for (employee, name) salary components
pub const COMPONENT_NAME_INDEX: &str = "idx_salary_component_employee_name";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Opens a connection pool to `database_url` sized and timed by `store`.
#[instrument(skip(store))]
pub async fn connect(database_url: &str, store: &StoreSettings) -> Result<DatabaseConnection> {
    let busy_timeout = store.busy_timeout();
    let mut options = ConnectOptions::new(database_url.to_owned());
    options
        .max_connections(store.max_connections)
        .acquire_timeout(store.acquire_timeout())
        .sqlx_logging(false)
        .map_sqlx_sqlite_opts(move |opts| opts.busy_timeout(busy_timeout));

    let db = Database::connect(options).await?;
    info!("Connected to database");
    Ok(db)
}

/// Connects and makes sure every table and index exists.
pub async fn init_db(database_url: &str, store: &StoreSettings) -> Result<DatabaseConnection> {
    let db = connect(database_url, store).await?;
    create_tables(&db).await?;
    Ok(db)
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut table = schema.create_table_from_entity(entity);
    table.if_not_exists();
    db.execute(builder.build(&table)).await?;
    Ok(())
}

fn unique_indexes() -> [IndexCreateStatement; 3] {
    [
        Index::create()
            .name(ATTENDANCE_DAY_INDEX)
            .table(AttendanceRecord)
            .col(attendance_record::Column::EmployeeId)
            .col(attendance_record::Column::Date)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name(PAYROLL_MONTH_INDEX)
            .table(PayrollRecord)
            .col(payroll_record::Column::EmployeeId)
            .col(payroll_record::Column::Month)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name(COMPONENT_NAME_INDEX)
            .table(SalaryComponent)
            .col(salary_component::Column::EmployeeId)
            .col(salary_component::Column::Name)
            .unique()
            .if_not_exists()
            .to_owned(),
    ]
}

/// Creates all ledger tables and unique indexes; safe to run repeatedly.
///
/// Tables are created parents first so foreign keys resolve.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    create_table(db, &schema, Employee).await?;
    create_table(db, &schema, EmployeeProfile).await?;
    create_table(db, &schema, AttendanceRecord).await?;
    create_table(db, &schema, LeaveRequest).await?;
    create_table(db, &schema, SalaryStructure).await?;
    create_table(db, &schema, SalaryComponent).await?;
    create_table(db, &schema, PayrollRecord).await?;

    for index in unique_indexes() {
        db.execute(builder.build(&index)).await?;
    }

    debug!("Ledger schema ensured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        attendance_record::Model as AttendanceModel, employee::Model as EmployeeModel,
        leave_request::Model as LeaveModel, payroll_record::Model as PayrollModel,
        salary_structure::Model as StructureModel,
    };
    use sea_orm::QuerySelect;

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<EmployeeModel> = Employee::find().limit(1).all(&db).await?;
        let _: Vec<AttendanceModel> = AttendanceRecord::find().limit(1).all(&db).await?;
        let _: Vec<LeaveModel> = LeaveRequest::find().limit(1).all(&db).await?;
        let _: Vec<StructureModel> = SalaryStructure::find().limit(1).all(&db).await?;
        let _: Vec<PayrollModel> = PayrollRecord::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_connect_with_store_settings() -> Result<()> {
        let store = StoreSettings {
            max_connections: 1,
            ..StoreSettings::default()
        };
        let db = init_db("sqlite::memory:", &store).await?;
        let _: Vec<EmployeeModel> = Employee::find().limit(1).all(&db).await?;
        Ok(())
    }
}
