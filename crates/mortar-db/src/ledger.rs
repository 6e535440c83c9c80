//! # Stock Ledger
//!
//! Moves a medicine's on-hand quantity inside the caller's transaction.
//!
//! ## Check-and-Act in One Statement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  reserve(medicine 7, qty 30)                                            │
//! │                                                                         │
//! │  UPDATE medicines                                                       │
//! │     SET stock_quantity = stock_quantity - 30, version = version + 1     │
//! │   WHERE id = 7 AND stock_quantity >= 30                                 │
//! │       │                                                                 │
//! │       ├── 1 row  → reserved                                             │
//! │       └── 0 rows → medicine missing (NotFound)                          │
//! │                    or short on stock (InsufficientStock)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The stock check and the decrement can never be split by another writer,
//! so two sales racing for the last units cannot both succeed.
//!
//! `release` is crate-private: the only way stock comes back is by deleting
//! a persisted sale item (see `lifecycle`), and each item row is deleted at
//! most once.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::{debug, warn};

use mortar_core::validation::validate_line_quantity;
use mortar_core::CoreError;

use crate::error::{DbError, DbResult};

/// Takes `qty` units of `medicine_id` out of stock.
///
/// Returns the remaining stock. On error nothing has been written.
pub async fn reserve(conn: &mut SqliteConnection, medicine_id: i64, qty: i64) -> DbResult<i64> {
    validate_line_quantity(qty)?;

    let result = sqlx::query(
        r#"
        UPDATE medicines
        SET stock_quantity = stock_quantity - ?1,
            version = version + 1,
            updated_at = ?2
        WHERE id = ?3 AND stock_quantity >= ?1
        "#,
    )
    .bind(qty)
    .bind(Utc::now())
    .bind(medicine_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        let row: Option<(String, i64)> =
            sqlx::query_as("SELECT name, stock_quantity FROM medicines WHERE id = ?1")
                .bind(medicine_id)
                .fetch_optional(&mut *conn)
                .await?;

        return match row {
            None => Err(DbError::not_found("Medicine", medicine_id)),
            Some((name, available)) => {
                warn!(
                    medicine_id,
                    available,
                    requested = qty,
                    "Stock reservation rejected"
                );
                Err(CoreError::InsufficientStock {
                    medicine: name,
                    available,
                    requested: qty,
                }
                .into())
            }
        };
    }

    let remaining: i64 = sqlx::query_scalar("SELECT stock_quantity FROM medicines WHERE id = ?1")
        .bind(medicine_id)
        .fetch_one(&mut *conn)
        .await?;

    debug!(medicine_id, qty, remaining, "Stock reserved");
    Ok(remaining)
}

/// Puts `qty` units of `medicine_id` back into stock.
///
/// Callers must have just deleted the sale item row that recorded this
/// reservation, in the same transaction.
pub(crate) async fn release(
    conn: &mut SqliteConnection,
    medicine_id: i64,
    qty: i64,
) -> DbResult<i64> {
    let result = sqlx::query(
        r#"
        UPDATE medicines
        SET stock_quantity = stock_quantity + ?1,
            version = version + 1,
            updated_at = ?2
        WHERE id = ?3
        "#,
    )
    .bind(qty)
    .bind(Utc::now())
    .bind(medicine_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Medicine", medicine_id));
    }

    let restored: i64 = sqlx::query_scalar("SELECT stock_quantity FROM medicines WHERE id = ?1")
        .bind(medicine_id)
        .fetch_one(&mut *conn)
        .await?;

    debug!(medicine_id, qty, restored, "Stock released");
    Ok(restored)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pool::{Database, DbConfig};
    use crate::repository::test_support::seed_medicine;

    #[tokio::test]
    async fn test_reserve_decrements_and_bumps_version() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let medicine = seed_medicine(&db, "Aspirin", 100, 1000).await;

        let mut tx = db.pool().begin().await.unwrap();
        assert_eq!(reserve(&mut tx, medicine.id, 30).await.unwrap(), 70);
        tx.commit().await.unwrap();

        let after = db.medicines().get_by_id(medicine.id).await.unwrap().unwrap();
        assert_eq!(after.stock_quantity, 70);
        assert_eq!(after.version, medicine.version + 1);
    }

    #[tokio::test]
    async fn test_reserve_insufficient_leaves_stock() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let medicine = seed_medicine(&db, "Aspirin", 5, 1000).await;

        let mut tx = db.pool().begin().await.unwrap();
        let err = reserve(&mut tx, medicine.id, 10).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);
        tx.rollback().await.unwrap();

        let after = db.medicines().get_by_id(medicine.id).await.unwrap().unwrap();
        assert_eq!(after.stock_quantity, 5);
        assert_eq!(after.version, medicine.version);
    }

    #[tokio::test]
    async fn test_reserve_unknown_medicine() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        let err = reserve(&mut tx, 999, 1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_reserve_rejects_bad_quantity() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let medicine = seed_medicine(&db, "Aspirin", 5, 1000).await;

        let mut tx = db.pool().begin().await.unwrap();
        let err = reserve(&mut tx, medicine.id, 0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_release_restores() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let medicine = seed_medicine(&db, "Aspirin", 10, 1000).await;

        let mut tx = db.pool().begin().await.unwrap();
        reserve(&mut tx, medicine.id, 4).await.unwrap();
        assert_eq!(release(&mut tx, medicine.id, 4).await.unwrap(), 10);
        tx.commit().await.unwrap();
    }
}
