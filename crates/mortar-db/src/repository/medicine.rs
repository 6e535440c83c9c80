//! # Medicine Repository
//!
//! Database operations for medicines.
//!
//! ## Key Operations
//! - CRUD with optimistic versioning on edits
//! - Paginated search by name, manufacturer or category
//! - Lookups: price quote, picker search, low-stock report
//!
//! ## Optimistic Versioning
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Editor A reads Aspirin (version 4)      Editor B reads Aspirin (v4)    │
//! │       │                                        │                        │
//! │       ▼                                        │                        │
//! │  UPDATE ... WHERE id = 7 AND version = 4       │                        │
//! │  → 1 row, version becomes 5                    ▼                        │
//! │                                  UPDATE ... WHERE id = 7 AND version = 4│
//! │                                  → 0 rows → DbError::Conflict           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Stock reservations bump the version too, so an edit based on a stale
//! stock figure is rejected rather than silently overwriting a sale.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use mortar_core::{
    Medicine, MedicineCategory, MedicineFilter, MedicineHit, MedicineUpdate, NewMedicine, Page,
    PriceQuote,
};

use crate::error::{DbError, DbResult};
use crate::pool::Listing;
use crate::repository::{like_pattern, PageWindow};

const COLUMNS: &str = r#"
    id, name, description, manufacturer, category, price_cents,
    stock_quantity, reorder_level, expiry_date, created_at, updated_at, version
"#;

/// Repository for medicine database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.medicines();
///
/// let quote = repo.price_quote(7).await?;          // { price: 10.0, stock_quantity: 70 }
/// let hits = repo.search_hits("amox").await?;      // at most search_limit hits
/// ```
#[derive(Debug, Clone)]
pub struct MedicineRepository {
    pool: SqlitePool,
    listing: Listing,
}

impl MedicineRepository {
    /// Creates a new MedicineRepository.
    pub fn new(pool: SqlitePool, listing: Listing) -> Self {
        MedicineRepository { pool, listing }
    }

    /// Inserts a medicine after validating it.
    pub async fn create(&self, medicine: &NewMedicine) -> DbResult<Medicine> {
        let now = Utc::now();
        medicine.validate(now.date_naive())?;

        debug!(name = %medicine.name, manufacturer = %medicine.manufacturer, "Creating medicine");

        let result = sqlx::query(
            r#"
            INSERT INTO medicines (
                name, description, manufacturer, category, price_cents,
                stock_quantity, reorder_level, expiry_date, created_at, updated_at, version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9, 1)
            "#,
        )
        .bind(medicine.name.trim())
        .bind(medicine.description.as_deref().map(str::trim))
        .bind(medicine.manufacturer.trim())
        .bind(medicine.category)
        .bind(medicine.price_cents)
        .bind(medicine.stock_quantity)
        .bind(medicine.reorder_level)
        .bind(medicine.expiry_date)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        info!(medicine_id = id, name = %medicine.name, "Medicine created");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Medicine", id))
    }

    /// Gets a medicine by its ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Medicine>> {
        let medicine = sqlx::query_as(&format!("SELECT {} FROM medicines WHERE id = ?1", COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(medicine)
    }

    /// Applies an edit if the stored version still equals
    /// `update.expected_version`.
    ///
    /// ## Returns
    /// * `Ok(Medicine)` - The updated row, version incremented
    /// * `Err(DbError::Conflict)` - Someone else wrote the row first
    pub async fn update(&self, id: i64, update: &MedicineUpdate) -> DbResult<Medicine> {
        let now = Utc::now();

        let current = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Medicine", id))?;

        update.validate(now.date_naive(), current.expiry_date)?;

        debug!(medicine_id = id, expected_version = update.expected_version, "Updating medicine");

        let result = sqlx::query(
            r#"
            UPDATE medicines
            SET name = ?1, description = ?2, manufacturer = ?3, category = ?4,
                price_cents = ?5, stock_quantity = ?6, reorder_level = ?7,
                expiry_date = ?8, updated_at = ?9, version = version + 1
            WHERE id = ?10 AND version = ?11
            "#,
        )
        .bind(update.name.trim())
        .bind(update.description.as_deref().map(str::trim))
        .bind(update.manufacturer.trim())
        .bind(update.category)
        .bind(update.price_cents)
        .bind(update.stock_quantity)
        .bind(update.reorder_level)
        .bind(update.expiry_date)
        .bind(now)
        .bind(id)
        .bind(update.expected_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match self.get_by_id(id).await? {
                None => Err(DbError::not_found("Medicine", id)),
                Some(_) => Err(DbError::Conflict {
                    entity: "Medicine".to_string(),
                    id: id.to_string(),
                    expected_version: update.expected_version,
                }),
            };
        }

        info!(medicine_id = id, "Medicine updated");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Medicine", id))
    }

    /// Deletes a medicine that no prescription or sale refers to.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM medicines WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::ForeignKeyViolation { .. } => {
                    DbError::referenced("Medicine", id, "prescriptions or sales")
                }
                other => other,
            })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Medicine", id));
        }

        info!(medicine_id = id, "Medicine deleted");
        Ok(())
    }

    /// Lists medicines ordered by name.
    ///
    /// The search term matches name, manufacturer or category; the category
    /// filter must match exactly.
    pub async fn list(&self, filter: &MedicineFilter, page: u32) -> DbResult<Page<Medicine>> {
        let window = PageWindow::new(page, self.listing.per_page);
        let pattern = like_pattern(&filter.search)?;

        debug!(search = %filter.search, category = ?filter.category, page = window.page, "Listing medicines");

        let where_clause = r#"
            WHERE (name LIKE ?1 ESCAPE '\' OR manufacturer LIKE ?1 ESCAPE '\' OR category LIKE ?1 ESCAPE '\')
              AND (?2 IS NULL OR category = ?2)
        "#;

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM medicines {}", where_clause))
                .bind(&pattern)
                .bind(filter.category)
                .fetch_one(&self.pool)
                .await?;

        let items: Vec<Medicine> = sqlx::query_as(&format!(
            "SELECT {} FROM medicines {} ORDER BY name, id LIMIT ?3 OFFSET ?4",
            COLUMNS, where_clause
        ))
        .bind(&pattern)
        .bind(filter.category)
        .bind(window.limit())
        .bind(window.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(window.into_page(items, total))
    }

    /// Distinct categories in use, alphabetical.
    pub async fn categories(&self) -> DbResult<Vec<MedicineCategory>> {
        let categories =
            sqlx::query_scalar("SELECT DISTINCT category FROM medicines ORDER BY category")
                .fetch_all(&self.pool)
                .await?;
        Ok(categories)
    }

    /// Medicines with stock on hand, ordered by name. Feeds the sale item picker.
    pub async fn in_stock(&self) -> DbResult<Vec<Medicine>> {
        let medicines = sqlx::query_as(&format!(
            "SELECT {} FROM medicines WHERE stock_quantity > 0 ORDER BY name, id",
            COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(medicines)
    }

    /// Price and stock for one medicine.
    pub async fn price_quote(&self, id: i64) -> DbResult<PriceQuote> {
        let medicine = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Medicine", id))?;
        Ok(PriceQuote::from(&medicine))
    }

    /// Name substring search for the picker, capped at the search limit.
    /// An empty query returns no hits.
    pub async fn search_hits(&self, query: &str) -> DbResult<Vec<MedicineHit>> {
        let pattern = like_pattern(query)?;
        if pattern == "%%" {
            return Ok(Vec::new());
        }

        let medicines: Vec<Medicine> = sqlx::query_as(&format!(
            "SELECT {} FROM medicines WHERE name LIKE ?1 ESCAPE '\\' ORDER BY name, id LIMIT ?2",
            COLUMNS
        ))
        .bind(&pattern)
        .bind(i64::from(self.listing.search_limit))
        .fetch_all(&self.pool)
        .await?;

        debug!(query = %query, count = medicines.len(), "Search returned medicines");
        Ok(medicines.iter().map(MedicineHit::from).collect())
    }

    /// Medicines at or below their reorder level, lowest stock first.
    pub async fn low_stock(&self) -> DbResult<Vec<Medicine>> {
        let medicines = sqlx::query_as(&format!(
            r#"
            SELECT {} FROM medicines
            WHERE stock_quantity <= reorder_level
            ORDER BY stock_quantity, name
            LIMIT ?1
            "#,
            COLUMNS
        ))
        .bind(i64::from(self.listing.low_stock_limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(medicines)
    }

    /// Counts all medicines.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM medicines")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
