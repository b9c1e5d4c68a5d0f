//! Employee code allocation.
//!
//! Codes look like `OIJODO20260001`: company code, two letters of each name,
//! the year, and a four-digit serial scoped to that exact prefix. The serial is
//! `count(prefix) + 1`, read and claimed inside one transaction that also
//! inserts the employee. The unique index on `employee_code` is the final
//! backstop: losing a race surfaces as a unique violation (or, on `SQLite`, as
//! a lock wait that outlasted the busy timeout), and the allocation is retried
//! with a fresh count up to the configured number of attempts.

use crate::{
    core::{
        employee::{self, EmployeeRecord, NewEmployee},
        store,
    },
    entities::{Employee, employee as employee_entity},
    errors::{Error, Result},
};
use sea_orm::prelude::*;
use tracing::{debug, info, instrument, warn};

/// Highest serial a four-digit code can carry.
pub const MAX_SERIAL: u64 = 9999;

fn initials(field: &'static str, value: &str) -> Result<String> {
    let letters: String = value.trim().chars().take(2).collect();
    if letters.chars().count() != 2 || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(Error::InvalidNameInput {
            field,
            value: value.to_string(),
        });
    }
    Ok(letters.to_ascii_uppercase())
}

/// Builds the serial-less prefix, e.g. `OIJODO2026`.
///
/// Each of company code, first name and last name must start with two ASCII
/// letters, and the year must have four digits.
pub fn code_prefix(company_code: &str, first_name: &str, last_name: &str, year: i32) -> Result<String> {
    if company_code.trim().chars().count() != 2 {
        return Err(Error::InvalidNameInput {
            field: "company_code",
            value: company_code.to_string(),
        });
    }
    let company = initials("company_code", company_code)?;
    let first = initials("first_name", first_name)?;
    let last = initials("last_name", last_name)?;
    if !(1000..=9999).contains(&year) {
        return Err(Error::InvalidNameInput {
            field: "year",
            value: year.to_string(),
        });
    }
    Ok(format!("{company}{first}{last}{year}"))
}

/// Appends the zero-padded serial to a prefix.
#[must_use]
pub fn format_employee_code(prefix: &str, serial: u64) -> String {
    format!("{prefix}{serial:04}")
}

async fn next_serial<C>(db: &C, prefix: &str) -> Result<u64>
where
    C: ConnectionTrait,
{
    let taken = Employee::find()
        .filter(employee_entity::Column::EmployeeCode.starts_with(prefix))
        .count(db)
        .await?;
    Ok(taken + 1)
}

/// Allocates the next code for the employee's prefix and inserts the employee
/// (and profile) under it in the same transaction.
///
/// # Errors
/// * `InvalidNameInput` - the inputs cannot form a well-formed code; checked
///   before the store is touched
/// * `EmailTaken` - another employee already uses the email
/// * `AllocationExhausted` - every attempt lost its race, or the prefix has
///   used all 9999 serials
#[instrument(skip(db, new_employee), fields(email = %new_employee.email))]
pub async fn allocate_employee_code(
    db: &DatabaseConnection,
    company_code: &str,
    new_employee: &NewEmployee,
    year: i32,
    max_attempts: u32,
) -> Result<EmployeeRecord> {
    let prefix = code_prefix(
        company_code,
        &new_employee.first_name,
        &new_employee.last_name,
        year,
    )?;
    let company_code = company_code.trim().to_ascii_uppercase();

    for attempt in 1..=max_attempts {
        let txn = match store::begin_serializable(db).await {
            Ok(txn) => txn,
            Err(e) if store::is_busy(&e) => {
                warn!(%prefix, attempt, "Store busy, retrying allocation");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if employee::email_in_use(&txn, &new_employee.email).await? {
            return Err(Error::EmailTaken {
                email: new_employee.email.clone(),
            });
        }

        let serial = next_serial(&txn, &prefix).await?;
        if serial > MAX_SERIAL {
            return Err(Error::AllocationExhausted {
                prefix,
                attempts: attempt,
            });
        }
        let code = format_employee_code(&prefix, serial);
        debug!(%code, attempt, "Claiming employee code");

        let claimed = match employee::insert_employee_rows(&txn, &code, &company_code, new_employee)
            .await
        {
            // Dropping the transaction on a lost race rolls it back before the next attempt.
            Ok(record) => txn.commit().await.map(|()| record),
            Err(e) => Err(e),
        };
        match claimed {
            Ok(record) => {
                info!(code = %record.employee.employee_code, id = record.employee.id, "Employee provisioned");
                return Ok(record);
            }
            Err(e) if store::is_unique_violation(&e) || store::is_busy(&e) => {
                warn!(%code, attempt, error = %e, "Lost allocation race, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(Error::AllocationExhausted {
        prefix,
        attempts: max_attempts,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::{collections::HashSet, sync::Arc};
    use tokio::task::JoinSet;

    #[test]
    fn test_code_prefix_format() {
        let prefix = code_prefix("OI", "John", "Doe", 2026).unwrap();
        assert_eq!(prefix, "OIJODO2026");
        assert_eq!(format_employee_code(&prefix, 1), "OIJODO20260001");
        assert_eq!(format_employee_code(&prefix, 42), "OIJODO20260042");
    }

    #[test]
    fn test_code_prefix_uppercases_and_trims() {
        assert_eq!(code_prefix("oi", "  jane ", "smith", 2026).unwrap(), "OIJASM2026");
    }

    #[test]
    fn test_code_prefix_rejects_short_or_non_letter_names() {
        assert!(matches!(
            code_prefix("OI", "J", "Doe", 2026),
            Err(Error::InvalidNameInput { field: "first_name", .. })
        ));
        assert!(matches!(
            code_prefix("OI", "John", "", 2026),
            Err(Error::InvalidNameInput { field: "last_name", .. })
        ));
        assert!(matches!(
            code_prefix("OI", "J0hn", "Doe", 2026),
            Err(Error::InvalidNameInput { field: "first_name", .. })
        ));
        assert!(matches!(
            code_prefix("OIX", "John", "Doe", 2026),
            Err(Error::InvalidNameInput { field: "company_code", .. })
        ));
        assert!(matches!(
            code_prefix("OI", "John", "Doe", 26),
            Err(Error::InvalidNameInput { field: "year", .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_name_fails_before_store() -> Result<()> {
        let db = MockDatabase::new(DatabaseBackend::Sqlite).into_connection();

        let result =
            allocate_employee_code(&db, "OI", &new_employee("X", "Doe", "x@co"), 2026, 3).await;
        assert!(matches!(result, Err(Error::InvalidNameInput { .. })));
        assert!(db.into_transaction_log().is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_serials_increase_per_prefix() -> Result<()> {
        let db = setup_test_db().await?;

        let first = allocate_employee_code(&db, "OI", &new_employee("John", "Doe", "john@co"), 2026, 3)
            .await?;
        let second =
            allocate_employee_code(&db, "OI", &new_employee("Joan", "Dodd", "joan@co"), 2026, 3)
                .await?;
        let other_prefix =
            allocate_employee_code(&db, "OI", &new_employee("Jane", "Smith", "jane@co"), 2026, 3)
                .await?;
        let next_year =
            allocate_employee_code(&db, "OI", &new_employee("John", "Dover", "dover@co"), 2027, 3)
                .await?;

        assert_eq!(first.employee.employee_code, "OIJODO20260001");
        assert_eq!(second.employee.employee_code, "OIJODO20260002");
        assert_eq!(other_prefix.employee.employee_code, "OIJASM20260001");
        assert_eq!(next_year.employee.employee_code, "OIJODO20270001");
        assert_eq!(first.profile.first_name, "John");

        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() -> Result<()> {
        let db = setup_test_db().await?;

        allocate_employee_code(&db, "OI", &new_employee("John", "Doe", "same@co"), 2026, 3).await?;
        let result =
            allocate_employee_code(&db, "OI", &new_employee("Mary", "Major", "same@co"), 2026, 3)
                .await;
        assert!(matches!(result, Err(Error::EmailTaken { .. })));

        // The failed attempt did not consume a serial for its prefix
        let next =
            allocate_employee_code(&db, "OI", &new_employee("Mary", "Major", "mary@co"), 2026, 3)
                .await?;
        assert_eq!(next.employee.employee_code, "OIMAMA20260001");

        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_allocations_are_distinct_and_gapless() -> Result<()> {
        let (_dir, db) = setup_file_db(4).await?;
        let callers = 8;

        let mut tasks = JoinSet::new();
        for i in 0..callers {
            let db = Arc::clone(&db);
            tasks.spawn(async move {
                let email = format!("john{i}@co");
                allocate_employee_code(&db, "OI", &new_employee("John", "Doe", &email), 2026, 5)
                    .await
            });
        }

        let mut codes = HashSet::new();
        while let Some(joined) = tasks.join_next().await {
            let record = joined.unwrap()?;
            assert!(codes.insert(record.employee.employee_code));
        }

        let expected: HashSet<String> = (1..=callers)
            .map(|serial| format_employee_code("OIJODO2026", serial))
            .collect();
        assert_eq!(codes, expected);

        Ok(())
    }

    #[tokio::test]
    async fn test_preexisting_code_collision_is_retried() -> Result<()> {
        let db = setup_test_db().await?;

        // A legacy row holds serial 0002 while serial 0001 is free, so the
        // first claim (count 1 -> serial 0002) collides and must be retried.
        let legacy = allocate_employee_code(&db, "OI", &new_employee("John", "Doe", "a@co"), 2026, 3)
            .await?;
        let mut active: employee_entity::ActiveModel = legacy.employee.into();
        active.employee_code = sea_orm::Set("OIJODO20260002".to_string());
        active.update(&db).await?;

        let result =
            allocate_employee_code(&db, "OI", &new_employee("John", "Doe", "b@co"), 2026, 1).await;
        assert!(matches!(
            result,
            Err(Error::AllocationExhausted { attempts: 1, .. })
        ));

        Ok(())
    }
}
