//! Transaction helpers shared by the ledger components.
//!
//! The store is the only synchronisation point: invariants are held by
//! transaction boundaries plus unique indexes, and constraint failures are
//! recognised here so each component can translate them into its own error.

use sea_orm::{
    AccessMode, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, DbErr,
    IsolationLevel, RuntimeErr, SqlErr, TransactionTrait, sqlx,
};

/// First statement of every `SQLite` write transaction. It matches no rows
/// but still takes the RESERVED lock before anything is read.
const SQLITE_RESERVE_WRITE_LOCK: &str = "UPDATE employees SET is_active = is_active WHERE id IS NULL";

/// `SQLITE_BUSY` and `SQLITE_LOCKED` primary result codes.
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// Opens a write transaction with serializable isolation.
///
/// `SQLite` is serializable already but starts transactions deferred: two
/// writers that both read first cannot both upgrade, and the loser fails
/// with `SQLITE_BUSY` without waiting. Taking the write lock as the first
/// statement makes concurrent writers queue on the busy timeout instead.
pub(crate) async fn begin_serializable(
    db: &DatabaseConnection,
) -> Result<DatabaseTransaction, DbErr> {
    match db.get_database_backend() {
        DbBackend::Sqlite => {
            let txn = db.begin().await?;
            txn.execute_unprepared(SQLITE_RESERVE_WRITE_LOCK).await?;
            Ok(txn)
        }
        _ => {
            db.begin_with_config(Some(IsolationLevel::Serializable), Some(AccessMode::ReadWrite))
                .await
        }
    }
}

/// True when the error is a unique-key violation.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// True when the error is a foreign-key violation.
pub(crate) fn is_foreign_key_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_)))
}

/// True when `SQLite` gave up waiting for a lock held by another connection.
///
/// Extended codes (`SQLITE_BUSY_SNAPSHOT` and friends) carry the primary
/// code in their low byte.
pub(crate) fn is_busy(err: &DbErr) -> bool {
    let (DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::Database(e)))
    | DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(e)))
    | DbErr::Conn(RuntimeErr::SqlxError(sqlx::Error::Database(e)))) = err
    else {
        return false;
    };
    e.code()
        .and_then(|code| code.parse::<i32>().ok())
        .is_some_and(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_non_database_errors_are_not_busy() {
        assert!(!is_busy(&DbErr::RecordNotInserted));
        assert!(!is_busy(&DbErr::Exec(RuntimeErr::Internal(
            "database is locked".to_string()
        ))));
    }

    #[tokio::test]
    async fn test_second_writer_waits_then_proceeds() -> crate::Result<()> {
        let (_dir, db) = setup_file_db(2).await?;

        let first = begin_serializable(&db).await?;
        let waiting = tokio::spawn({
            let db = std::sync::Arc::clone(&db);
            async move {
                let txn = begin_serializable(&db).await?;
                txn.commit().await
            }
        });

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert!(!waiting.is_finished());
        first.commit().await?;

        waiting.await.unwrap()?;
        Ok(())
    }

    #[tokio::test]
    async fn test_busy_timeout_surfaces_as_busy() -> crate::Result<()> {
        let (_dir, db) = setup_file_db_with_busy_timeout(2, 0).await?;

        let _holder = begin_serializable(&db).await?;
        let err = begin_serializable(&db).await.unwrap_err();
        assert!(is_busy(&err));

        let mapped = crate::Error::from(err);
        assert!(matches!(mapped, crate::Error::StoreUnavailable { .. }));
        assert!(mapped.is_retryable());
        Ok(())
    }
}
