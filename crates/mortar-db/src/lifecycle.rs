//! # Sale Lifecycle
//!
//! Orchestrates sale changes against the stock ledger and the aggregator.
//! Every function here runs on a connection that is already inside a
//! transaction; the caller commits or drops it.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   create ──► Draft ──add_item──► Active ──finalize──► Finalized        │
//! │                ▲                    │                                   │
//! │                └── remove last item ┘                                   │
//! │                                                                         │
//! │   delete_sale from any state: release every item, then drop the sale   │
//! │   update_header only while the sale has no items                        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Write First
//! Each operation on an existing sale starts by touching the sale row. That
//! takes SQLite's write lock before anything is read, so a transaction
//! never reads a snapshot that another writer invalidates before it
//! commits. Concurrent operations queue on `busy_timeout` instead.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::debug;

use mortar_core::aggregate;
use mortar_core::{CoreError, NewSaleItem, Sale, SaleHeader, SaleItem, SaleStatus};

use crate::error::{DbError, DbResult};
use crate::ledger;

pub(crate) const SALE_COLUMNS: &str = r#"
    id, invoice_number, customer_id, employee_id, prescription_id,
    sale_date, status, total_cents, created_at, updated_at
"#;

pub(crate) const SALE_ITEM_COLUMNS: &str = r#"
    id, sale_id, medicine_id, quantity, unit_price_cents, created_at
"#;

// =============================================================================
// Create
// =============================================================================

/// Opens a new Draft sale with a zero total.
///
/// The invoice number is `INV-YYYYMMDD-NNNN`, numbered per day. It is
/// computed inside the INSERT so two concurrent creates cannot pick the
/// same number.
pub async fn create_sale(
    conn: &mut SqliteConnection,
    header: &SaleHeader,
    now: DateTime<Utc>,
) -> DbResult<Sale> {
    header.validate(now)?;

    let prefix = format!("INV-{}-", now.format("%Y%m%d"));

    let result = sqlx::query(
        r#"
        INSERT INTO sales (
            invoice_number, customer_id, employee_id, prescription_id,
            sale_date, status, total_cents, created_at, updated_at
        ) VALUES (
            ?1 || printf('%04d', (
                SELECT COALESCE(MAX(CAST(substr(invoice_number, length(?1) + 1) AS INTEGER)), 0) + 1
                FROM sales
                WHERE invoice_number LIKE ?1 || '%'
            )),
            ?2, ?3, ?4,
            ?5, ?6, 0, ?7, ?7
        )
        "#,
    )
    .bind(&prefix)
    .bind(header.customer_id)
    .bind(header.employee_id)
    .bind(header.prescription_id)
    .bind(header.sale_date)
    .bind(SaleStatus::Draft)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    let sale = fetch_sale(conn, result.last_insert_rowid()).await?;
    debug!(sale_id = sale.id, invoice = %sale.invoice_number, "Sale created");
    Ok(sale)
}

// =============================================================================
// Item changes
// =============================================================================

/// Adds a line to a sale: reserve stock, insert the item, recompute the
/// total. A Draft sale becomes Active.
pub async fn add_item(
    conn: &mut SqliteConnection,
    sale_id: i64,
    item: &NewSaleItem,
    now: DateTime<Utc>,
) -> DbResult<(SaleItem, Sale)> {
    item.validate()?;

    let sale = lock_sale(conn, sale_id, now).await?;
    ensure_open(&sale, "add items to")?;

    ledger::reserve(conn, item.medicine_id, item.quantity).await?;

    let result = sqlx::query(
        r#"
        INSERT INTO sale_items (sale_id, medicine_id, quantity, unit_price_cents, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(sale_id)
    .bind(item.medicine_id)
    .bind(item.quantity)
    .bind(item.unit_price_cents)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    let created: SaleItem = sqlx::query_as(&format!(
        "SELECT {} FROM sale_items WHERE id = ?1",
        SALE_ITEM_COLUMNS
    ))
    .bind(result.last_insert_rowid())
    .fetch_one(&mut *conn)
    .await?;

    let sale = recompute(conn, sale).await?;
    Ok((created, sale))
}

/// Removes a line from a sale: delete the item, release its exact
/// quantity, recompute the total. The last item removed returns the sale
/// to Draft.
pub async fn remove_item(
    conn: &mut SqliteConnection,
    sale_id: i64,
    item_id: i64,
    now: DateTime<Utc>,
) -> DbResult<Sale> {
    let sale = lock_sale(conn, sale_id, now).await?;
    ensure_open(&sale, "remove items from")?;

    let item: SaleItem = sqlx::query_as(&format!(
        "SELECT {} FROM sale_items WHERE id = ?1",
        SALE_ITEM_COLUMNS
    ))
    .bind(item_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("Sale item", item_id))?;

    if item.sale_id != sale_id {
        return Err(CoreError::ItemNotInSale { sale_id, item_id }.into());
    }

    delete_item_and_release(conn, &item).await?;

    recompute(conn, sale).await
}

/// Deletes a sale in any state. Each item's quantity is released exactly
/// once before the sale row goes.
pub async fn delete_sale(
    conn: &mut SqliteConnection,
    sale_id: i64,
    now: DateTime<Utc>,
) -> DbResult<Vec<SaleItem>> {
    lock_sale(conn, sale_id, now).await?;

    let items = fetch_items(conn, sale_id).await?;
    for item in &items {
        delete_item_and_release(conn, item).await?;
    }

    sqlx::query("DELETE FROM sales WHERE id = ?1")
        .bind(sale_id)
        .execute(&mut *conn)
        .await?;

    debug!(sale_id, released_items = items.len(), "Sale deleted");
    Ok(items)
}

// =============================================================================
// Header and status
// =============================================================================

/// Edits customer, employee, prescription and date. Only allowed while
/// the sale has no items.
pub async fn update_header(
    conn: &mut SqliteConnection,
    sale_id: i64,
    header: &SaleHeader,
    now: DateTime<Utc>,
) -> DbResult<Sale> {
    header.validate(now)?;

    let sale = lock_sale(conn, sale_id, now).await?;

    let item_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sale_items WHERE sale_id = ?1")
        .bind(sale_id)
        .fetch_one(&mut *conn)
        .await?;

    if item_count > 0 || sale.status == SaleStatus::Finalized {
        return Err(CoreError::InvalidSaleStatus {
            sale_id,
            status: sale.status.to_string(),
            operation: "edit".to_string(),
        }
        .into());
    }

    sqlx::query(
        r#"
        UPDATE sales
        SET customer_id = ?1, employee_id = ?2, prescription_id = ?3, sale_date = ?4
        WHERE id = ?5
        "#,
    )
    .bind(header.customer_id)
    .bind(header.employee_id)
    .bind(header.prescription_id)
    .bind(header.sale_date)
    .bind(sale_id)
    .execute(&mut *conn)
    .await?;

    fetch_sale(conn, sale_id).await
}

/// Closes an Active sale for item changes.
pub async fn finalize_sale(
    conn: &mut SqliteConnection,
    sale_id: i64,
    now: DateTime<Utc>,
) -> DbResult<Sale> {
    let sale = lock_sale(conn, sale_id, now).await?;

    if sale.status != SaleStatus::Active {
        return Err(CoreError::InvalidSaleStatus {
            sale_id,
            status: sale.status.to_string(),
            operation: "finalize".to_string(),
        }
        .into());
    }

    sqlx::query("UPDATE sales SET status = ?1 WHERE id = ?2")
        .bind(SaleStatus::Finalized)
        .bind(sale_id)
        .execute(&mut *conn)
        .await?;

    fetch_sale(conn, sale_id).await
}

// =============================================================================
// Helpers
// =============================================================================

/// Touches the sale row (taking the write lock) and returns it.
async fn lock_sale(
    conn: &mut SqliteConnection,
    sale_id: i64,
    now: DateTime<Utc>,
) -> DbResult<Sale> {
    let result = sqlx::query("UPDATE sales SET updated_at = ?1 WHERE id = ?2")
        .bind(now)
        .bind(sale_id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Sale", sale_id));
    }

    fetch_sale(conn, sale_id).await
}

fn ensure_open(sale: &Sale, operation: &str) -> DbResult<()> {
    if !sale.status.accepts_item_changes() {
        return Err(CoreError::InvalidSaleStatus {
            sale_id: sale.id,
            status: sale.status.to_string(),
            operation: operation.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Deletes one item row and releases its quantity. The release only
/// happens if this call actually removed the row.
async fn delete_item_and_release(conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
    let deleted = sqlx::query("DELETE FROM sale_items WHERE id = ?1 AND sale_id = ?2")
        .bind(item.id)
        .bind(item.sale_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    if deleted != 1 {
        return Err(DbError::not_found("Sale item", item.id));
    }

    ledger::release(conn, item.medicine_id, item.quantity).await?;
    Ok(())
}

/// Recomputes the total from the stored items and moves the sale between
/// Draft and Active to match.
async fn recompute(conn: &mut SqliteConnection, mut sale: Sale) -> DbResult<Sale> {
    let items = fetch_items(conn, sale.id).await?;
    aggregate::recompute(&mut sale, &items);

    sale.status = match (sale.status, items.is_empty()) {
        (SaleStatus::Draft, false) => SaleStatus::Active,
        (SaleStatus::Active, true) => SaleStatus::Draft,
        (status, _) => status,
    };

    sqlx::query("UPDATE sales SET total_cents = ?1, status = ?2 WHERE id = ?3")
        .bind(sale.total_cents)
        .bind(sale.status)
        .bind(sale.id)
        .execute(&mut *conn)
        .await?;

    debug!(
        sale_id = sale.id,
        total_cents = sale.total_cents,
        items = items.len(),
        status = %sale.status,
        "Sale total recomputed"
    );
    Ok(sale)
}

pub(crate) async fn fetch_sale(conn: &mut SqliteConnection, sale_id: i64) -> DbResult<Sale> {
    sqlx::query_as(&format!("SELECT {} FROM sales WHERE id = ?1", SALE_COLUMNS))
        .bind(sale_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Sale", sale_id))
}

pub(crate) async fn fetch_items(
    conn: &mut SqliteConnection,
    sale_id: i64,
) -> DbResult<Vec<SaleItem>> {
    let items = sqlx::query_as(&format!(
        "SELECT {} FROM sale_items WHERE sale_id = ?1 ORDER BY id",
        SALE_ITEM_COLUMNS
    ))
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(items)
}
