//! # Supplier Repository
//!
//! Database operations for suppliers. Suppliers stand alone; nothing else
//! refers to them.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use mortar_core::{Page, Supplier, SupplierInput};

use crate::error::{DbError, DbResult};
use crate::pool::Listing;
use crate::repository::{like_pattern, PageWindow};

const COLUMNS: &str = "id, name, address, phone, email, created_at, updated_at";

/// Repository for supplier database operations.
#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
    listing: Listing,
}

impl SupplierRepository {
    /// Creates a new SupplierRepository.
    pub fn new(pool: SqlitePool, listing: Listing) -> Self {
        SupplierRepository { pool, listing }
    }

    pub async fn create(&self, input: &SupplierInput) -> DbResult<Supplier> {
        input.validate()?;

        let result = sqlx::query(
            r#"
            INSERT INTO suppliers (name, address, phone, email, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
        )
        .bind(input.name.trim())
        .bind(input.address.as_deref().map(str::trim))
        .bind(input.phone.trim())
        .bind(input.email.trim())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        info!(supplier_id = id, name = %input.name, "Supplier created");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Supplier", id))
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Supplier>> {
        let supplier = sqlx::query_as(&format!("SELECT {} FROM suppliers WHERE id = ?1", COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(supplier)
    }

    pub async fn update(&self, id: i64, input: &SupplierInput) -> DbResult<Supplier> {
        input.validate()?;

        let result = sqlx::query(
            r#"
            UPDATE suppliers
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
            return Err(DbError::not_found("Supplier", id));
        }

        info!(supplier_id = id, "Supplier updated");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Supplier", id))
    }

    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM suppliers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", id));
        }

        info!(supplier_id = id, "Supplier deleted");
        Ok(())
    }

    /// Lists suppliers by name, matching name, email or phone.
    pub async fn list(&self, search: &str, page: u32) -> DbResult<Page<Supplier>> {
        let window = PageWindow::new(page, self.listing.per_page);
        let pattern = like_pattern(search)?;

        let where_clause = r#"
            WHERE name LIKE ?1 ESCAPE '\' OR email LIKE ?1 ESCAPE '\' OR phone LIKE ?1 ESCAPE '\'
        "#;

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM suppliers {}", where_clause))
                .bind(&pattern)
                .fetch_one(&self.pool)
                .await?;

        let items = sqlx::query_as(&format!(
            "SELECT {} FROM suppliers {} ORDER BY name, id LIMIT ?2 OFFSET ?3",
            COLUMNS, where_clause
        ))
        .bind(&pattern)
        .bind(window.limit())
        .bind(window.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(window.into_page(items, total))
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM suppliers")
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

    fn input(name: &str, email: &str) -> SupplierInput {
        SupplierInput {
            name: name.to_string(),
            address: Some("Unit 4, Trade Park".to_string()),
            phone: "+44 113 496 0000".to_string(),
            email: email.to_string(),
        }
    }

    #[tokio::test]
    async fn test_crud() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.suppliers();

        let created = repo.create(&input("Smith & Sons", "orders@smith.example.com")).await.unwrap();
        assert_eq!(created.name, "Smith & Sons");

        let updated = repo
            .update(created.id, &input("Smith & Daughters", "orders@smith.example.com"))
            .await
            .unwrap();
        assert_eq!(updated.name, "Smith & Daughters");

        repo.delete(created.id).await.unwrap();
        assert!(repo.get_by_id(created.id).await.unwrap().is_none());
        assert_eq!(repo.delete(created.id).await.unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_list_and_duplicate_email() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.suppliers();
        repo.create(&input("Northwind", "sales@northwind.example.com")).await.unwrap();
        repo.create(&input("Contoso", "hello@contoso.example.com")).await.unwrap();

        let page = repo.list("north", 1).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].name, "Northwind");

        let err = repo
            .create(&input("Other", "hello@contoso.example.com"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Integrity);
        assert_eq!(repo.count().await.unwrap(), 2);
    }
}
