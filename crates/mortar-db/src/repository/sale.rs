//! # Sale Repository
//!
//! Entry point for the sale lifecycle. Each mutating method opens one
//! transaction, runs the matching [`lifecycle`](crate::lifecycle) function
//! on it and commits. An error drops the transaction, which rolls back
//! stock, items and total together.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sales.add_item(sale 3, { medicine 7, qty 30, unit 10.00 })             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │    lifecycle::add_item                                                  │
//! │      ├── touch sale 3 (write lock), reject if Finalized                 │
//! │      ├── ledger::reserve(7, 30)        stock 100 → 70                   │
//! │      ├── INSERT sale_items                                              │
//! │      └── recompute total               0.00 → 300.00, Draft → Active    │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use mortar_core::{NewSaleItem, Page, Sale, SaleDetail, SaleHeader, SaleItem};

use crate::error::{DbError, DbResult};
use crate::lifecycle::{self, SALE_COLUMNS, SALE_ITEM_COLUMNS};
use crate::pool::Listing;
use crate::repository::{like_pattern, PageWindow};

/// Repository for sales and their items.
///
/// ## Usage
/// ```rust,ignore
/// let sale = db.sales().create(&header).await?;
/// let (item, sale) = db.sales().add_item(sale.id, &line).await?;
/// let sale = db.sales().remove_item(sale.id, item.id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
    listing: Listing,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool, listing: Listing) -> Self {
        SaleRepository { pool, listing }
    }

    /// Opens a Draft sale with a fresh invoice number.
    pub async fn create(&self, header: &SaleHeader) -> DbResult<Sale> {
        let mut tx = self.pool.begin().await?;
        let sale = lifecycle::create_sale(&mut tx, header, Utc::now()).await?;
        tx.commit().await?;

        info!(sale_id = sale.id, invoice = %sale.invoice_number, "Sale created");
        Ok(sale)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as(&format!("SELECT {} FROM sales WHERE id = ?1", SALE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(sale)
    }

    /// A sale with its items.
    pub async fn detail(&self, id: i64) -> DbResult<SaleDetail> {
        let sale = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", id))?;
        let items = self.items(id).await?;
        Ok(SaleDetail { sale, items })
    }

    /// Items of a sale in the order they were added.
    pub async fn items(&self, sale_id: i64) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as(&format!(
            "SELECT {} FROM sale_items WHERE sale_id = ?1 ORDER BY id",
            SALE_ITEM_COLUMNS
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// Lists sales newest first, matching the search term against the
    /// customer's name or the invoice number.
    pub async fn list(&self, search: &str, page: u32) -> DbResult<Page<Sale>> {
        let window = PageWindow::new(page, self.listing.per_page);
        let pattern = like_pattern(search)?;

        debug!(search = %search, page = window.page, "Listing sales");

        let from_clause = r#"
            FROM sales s
            JOIN customers c ON c.id = s.customer_id
            WHERE c.name LIKE ?1 ESCAPE '\' OR s.invoice_number LIKE ?1 ESCAPE '\'
        "#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) {}", from_clause))
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await?;

        let items = sqlx::query_as(&format!(
            r#"
            SELECT s.id, s.invoice_number, s.customer_id, s.employee_id, s.prescription_id,
                   s.sale_date, s.status, s.total_cents, s.created_at, s.updated_at
            {}
            ORDER BY s.sale_date DESC, s.id DESC
            LIMIT ?2 OFFSET ?3
            "#,
            from_clause
        ))
        .bind(&pattern)
        .bind(window.limit())
        .bind(window.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(window.into_page(items, total))
    }

    /// Adds a line, reserving its stock. Returns the new item and the
    /// updated sale.
    pub async fn add_item(&self, sale_id: i64, item: &NewSaleItem) -> DbResult<(SaleItem, Sale)> {
        let mut tx = self.pool.begin().await?;
        let (created, sale) = lifecycle::add_item(&mut tx, sale_id, item, Utc::now()).await?;
        tx.commit().await?;

        info!(
            sale_id,
            item_id = created.id,
            medicine_id = created.medicine_id,
            quantity = created.quantity,
            total_cents = sale.total_cents,
            "Sale item added"
        );
        Ok((created, sale))
    }

    /// Removes a line, releasing its stock. Returns the updated sale.
    pub async fn remove_item(&self, sale_id: i64, item_id: i64) -> DbResult<Sale> {
        let mut tx = self.pool.begin().await?;
        let sale = lifecycle::remove_item(&mut tx, sale_id, item_id, Utc::now()).await?;
        tx.commit().await?;

        info!(sale_id, item_id, total_cents = sale.total_cents, "Sale item removed");
        Ok(sale)
    }

    /// Deletes a sale in any state, returning every item's stock.
    pub async fn delete(&self, sale_id: i64) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let released = lifecycle::delete_sale(&mut tx, sale_id, Utc::now()).await?;
        tx.commit().await?;

        info!(sale_id, released_items = released.len(), "Sale deleted");
        Ok(())
    }

    /// Edits the header of a sale that has no items yet.
    pub async fn update_header(&self, sale_id: i64, header: &SaleHeader) -> DbResult<Sale> {
        let mut tx = self.pool.begin().await?;
        let sale = lifecycle::update_header(&mut tx, sale_id, header, Utc::now()).await?;
        tx.commit().await?;

        info!(sale_id, "Sale header updated");
        Ok(sale)
    }

    /// Closes an Active sale for further item changes.
    pub async fn finalize(&self, sale_id: i64) -> DbResult<Sale> {
        let mut tx = self.pool.begin().await?;
        let sale = lifecycle::finalize_sale(&mut tx, sale_id, Utc::now()).await?;
        tx.commit().await?;

        info!(sale_id, total_cents = sale.total_cents, "Sale finalized");
        Ok(sale)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
