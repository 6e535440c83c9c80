//! # Customer Repository
//!
//! Database operations for customers.
//!
//! Deleting a customer also deletes their prescriptions. A customer with
//! sales on record cannot be deleted.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use mortar_core::{Customer, CustomerInput, Page};

use crate::error::{DbError, DbResult};
use crate::pool::Listing;
use crate::repository::{like_pattern, PageWindow};

const COLUMNS: &str = "id, name, address, phone, email, created_at, updated_at";

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
    listing: Listing,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool, listing: Listing) -> Self {
        CustomerRepository { pool, listing }
    }

    /// Inserts a customer. Email must be unique.
    pub async fn create(&self, input: &CustomerInput) -> DbResult<Customer> {
        input.validate()?;
        let now = Utc::now();

        debug!(name = %input.name, "Creating customer");

        let result = sqlx::query(
            r#"
            INSERT INTO customers (name, address, phone, email, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
        )
        .bind(input.name.trim())
        .bind(input.address.as_deref().map(str::trim))
        .bind(input.phone.trim())
        .bind(input.email.trim())
        .bind(now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        info!(customer_id = id, "Customer created");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", id))
    }

    /// Gets a customer by ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as(&format!("SELECT {} FROM customers WHERE id = ?1", COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(customer)
    }

    /// Replaces a customer's fields.
    pub async fn update(&self, id: i64, input: &CustomerInput) -> DbResult<Customer> {
        input.validate()?;

        let result = sqlx::query(
            r#"
            UPDATE customers
            SET name = ?1, address = ?2, phone = ?3, email = ?4, updated_at = ?5
            WHERE id = ?6
            "#,
        )
        .bind(input.name.trim())
        .bind(input.address.as_deref().map(str::trim))
        .bind(input.phone.trim())
        .bind(input.email.trim())
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        info!(customer_id = id, "Customer updated");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", id))
    }

    /// Deletes a customer and their prescriptions.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM customers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::ForeignKeyViolation { .. } => DbError::referenced("customer", id, "sales"),
                other => other,
            })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        info!(customer_id = id, "Customer deleted");
        Ok(())
    }

    /// Lists customers by name, matching the search term against name,
    /// email or phone.
    pub async fn list(&self, search: &str, page: u32) -> DbResult<Page<Customer>> {
        let window = PageWindow::new(page, self.listing.per_page);
        let pattern = like_pattern(search)?;

        let where_clause = r#"
            WHERE name LIKE ?1 ESCAPE '\' OR email LIKE ?1 ESCAPE '\' OR phone LIKE ?1 ESCAPE '\'
        "#;

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM customers {}", where_clause))
                .bind(&pattern)
                .fetch_one(&self.pool)
                .await?;

        let items = sqlx::query_as(&format!(
            "SELECT {} FROM customers {} ORDER BY name, id LIMIT ?2 OFFSET ?3",
            COLUMNS, where_clause
        ))
        .bind(&pattern)
        .bind(window.limit())
        .bind(window.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(window.into_page(items, total))
    }

    /// Every customer ordered by name. Feeds sale and prescription pickers.
    pub async fn all(&self) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as(&format!(
            "SELECT {} FROM customers ORDER BY name, id",
            COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(customers)
    }

    /// Counts all customers.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pool::{Database, DbConfig};
    use crate::repository::test_support::{seed_customer, seed_sale};

    fn input(name: &str, email: &str) -> CustomerInput {
        CustomerInput {
            name: name.to_string(),
            address: None,
            phone: "020 7946 0000".to_string(),
            email: email.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_get_update() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.customers();

        let created = repo.create(&input(" Ada Lovelace ", "ada@example.com")).await.unwrap();
        assert_eq!(created.name, "Ada Lovelace");
        assert!(created.address.is_none());

        let mut changed = input("Ada King", "ada@example.com");
        changed.address = Some("12 St James's Square".to_string());
        let updated = repo.update(created.id, &changed).await.unwrap();
        assert_eq!(updated.name, "Ada King");
        assert_eq!(updated.address.as_deref(), Some("12 St James's Square"));

        let err = repo.update(created.id + 1, &changed).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_invalid_input_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut bad = input("Ada", "ada@example.com");
        bad.phone = "12".to_string();

        let err = db.customers().create(&bad).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed_customer(&db, "Ada", "ada@example.com").await;

        let err = db
            .customers()
            .create(&input("Someone Else", "ada@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Integrity);
        assert_eq!(err.user_message(), "A record with this email already exists.");
    }

    #[tokio::test]
    async fn test_delete_with_sales_refused() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sale = seed_sale(&db).await;

        let err = db.customers().delete(sale.customer_id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Integrity);
        assert_eq!(err.user_message(), "Cannot delete customer as it is used in sales.");
    }

    #[tokio::test]
    async fn test_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customer = seed_customer(&db, "Ada", "ada@example.com").await;

        db.customers().delete(customer.id).await.unwrap();
        assert!(db.customers().get_by_id(customer.id).await.unwrap().is_none());
        assert_eq!(
            db.customers().delete(customer.id).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_list_search() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed_customer(&db, "Charles Babbage", "charles@example.com").await;
        seed_customer(&db, "Ada Lovelace", "ada@analytical.org").await;

        let all = db.customers().list("", 1).await.unwrap();
        assert_eq!(all.total, 2);
        assert_eq!(all.items[0].name, "Ada Lovelace");

        let by_email = db.customers().list("analytical", 1).await.unwrap();
        assert_eq!(by_email.total, 1);
        assert_eq!(by_email.items[0].name, "Ada Lovelace");

        assert_eq!(db.customers().list("nobody", 1).await.unwrap().total, 0);
        assert_eq!(db.customers().all().await.unwrap().len(), 2);
        assert_eq!(db.customers().count().await.unwrap(), 2);
    }
}
