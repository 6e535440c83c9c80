//! # Employee Repository
//!
//! Database operations for employees. An employee who has recorded sales
//! cannot be deleted.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use mortar_core::{Employee, EmployeeInput, Page};

use crate::error::{DbError, DbResult};
use crate::pool::Listing;
use crate::repository::{like_pattern, PageWindow};

const COLUMNS: &str = "id, name, position, phone, email, created_at, updated_at";

/// Repository for employee database operations.
#[derive(Debug, Clone)]
pub struct EmployeeRepository {
    pool: SqlitePool,
    listing: Listing,
}

impl EmployeeRepository {
    /// Creates a new EmployeeRepository.
    pub fn new(pool: SqlitePool, listing: Listing) -> Self {
        EmployeeRepository { pool, listing }
    }

    /// Inserts an employee. Email must be unique.
    pub async fn create(&self, input: &EmployeeInput) -> DbResult<Employee> {
        input.validate()?;
        let now = Utc::now();

        debug!(name = %input.name, position = %input.position, "Creating employee");

        let result = sqlx::query(
            r#"
            INSERT INTO employees (name, position, phone, email, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
        )
        .bind(input.name.trim())
        .bind(input.position)
        .bind(input.phone.trim())
        .bind(input.email.trim())
        .bind(now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        info!(employee_id = id, "Employee created");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Employee", id))
    }

    /// Gets an employee by ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Employee>> {
        let employee = sqlx::query_as(&format!("SELECT {} FROM employees WHERE id = ?1", COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(employee)
    }

    /// Replaces an employee's fields.
    pub async fn update(&self, id: i64, input: &EmployeeInput) -> DbResult<Employee> {
        input.validate()?;

        let result = sqlx::query(
            r#"
            UPDATE employees
            SET name = ?1, position = ?2, phone = ?3, email = ?4, updated_at = ?5
            WHERE id = ?6
            "#,
        )
        .bind(input.name.trim())
        .bind(input.position)
        .bind(input.phone.trim())
        .bind(input.email.trim())
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Employee", id));
        }

        info!(employee_id = id, "Employee updated");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Employee", id))
    }

    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM employees WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::ForeignKeyViolation { .. } => DbError::referenced("employee", id, "sales"),
                other => other,
            })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Employee", id));
        }

        info!(employee_id = id, "Employee deleted");
        Ok(())
    }

    /// Lists employees by name, matching the search term against name,
    /// email or position.
    pub async fn list(&self, search: &str, page: u32) -> DbResult<Page<Employee>> {
        let window = PageWindow::new(page, self.listing.per_page);
        let pattern = like_pattern(search)?;

        let where_clause = r#"
            WHERE name LIKE ?1 ESCAPE '\' OR email LIKE ?1 ESCAPE '\' OR position LIKE ?1 ESCAPE '\'
        "#;

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM employees {}", where_clause))
                .bind(&pattern)
                .fetch_one(&self.pool)
                .await?;

        let items = sqlx::query_as(&format!(
            "SELECT {} FROM employees {} ORDER BY name, id LIMIT ?2 OFFSET ?3",
            COLUMNS, where_clause
        ))
        .bind(&pattern)
        .bind(window.limit())
        .bind(window.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(window.into_page(items, total))
    }

    /// Every employee ordered by name.
    pub async fn all(&self) -> DbResult<Vec<Employee>> {
        let employees = sqlx::query_as(&format!(
            "SELECT {} FROM employees ORDER BY name, id",
            COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(employees)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM employees")
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
    use crate::repository::test_support::{seed_employee, seed_sale};
    use mortar_core::EmployeePosition;

    #[tokio::test]
    async fn test_create_and_update_position() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let employee = seed_employee(&db, "Grace Hopper", "grace@example.com").await;
        assert_eq!(employee.position, EmployeePosition::Pharmacist);

        let updated = db
            .employees()
            .update(
                employee.id,
                &EmployeeInput {
                    name: "Grace Hopper".to_string(),
                    position: EmployeePosition::Manager,
                    phone: employee.phone.clone(),
                    email: employee.email.clone(),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.position, EmployeePosition::Manager);
    }

    #[tokio::test]
    async fn test_list_matches_position() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        seed_employee(&db, "Grace Hopper", "grace@example.com").await;
        db.employees()
            .create(&EmployeeInput {
                name: "Alan Turing".to_string(),
                position: EmployeePosition::Cashier,
                phone: "0161 496 0000".to_string(),
                email: "alan@example.com".to_string(),
            })
            .await
            .unwrap();

        let cashiers = db.employees().list("cash", 1).await.unwrap();
        assert_eq!(cashiers.total, 1);
        assert_eq!(cashiers.items[0].name, "Alan Turing");

        let all = db.employees().all().await.unwrap();
        assert_eq!(all[0].name, "Alan Turing");
        assert_eq!(db.employees().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_delete_with_sales_refused() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let sale = seed_sale(&db).await;

        let err = db.employees().delete(sale.employee_id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Integrity);
    }

    #[tokio::test]
    async fn test_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let employee = seed_employee(&db, "Grace Hopper", "grace@example.com").await;
        db.employees().delete(employee.id).await.unwrap();
        assert_eq!(db.employees().count().await.unwrap(), 0);
    }
}
