//! # Prescription Repository
//!
//! Database operations for prescriptions and their items.
//!
//! A prescription item records what the doctor prescribed. It is checked
//! against the medicine's stock when added, but never reserves or releases
//! stock; only sale items do that.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use mortar_core::stock::check_reservation;
use mortar_core::{NewPrescriptionItem, Page, Prescription, PrescriptionInput, PrescriptionItem};

use crate::error::{DbError, DbResult};
use crate::pool::Listing;
use crate::repository::{like_pattern, PageWindow};

const COLUMNS: &str = r#"
    p.id, p.customer_id, p.doctor_name, p.prescription_date, p.notes,
    p.created_at, p.updated_at
"#;

const ITEM_COLUMNS: &str = "id, prescription_id, medicine_id, quantity, instructions, created_at";

/// Repository for prescription database operations.
#[derive(Debug, Clone)]
pub struct PrescriptionRepository {
    pool: SqlitePool,
    listing: Listing,
}

impl PrescriptionRepository {
    /// Creates a new PrescriptionRepository.
    pub fn new(pool: SqlitePool, listing: Listing) -> Self {
        PrescriptionRepository { pool, listing }
    }

    /// Records a prescription for an existing customer.
    pub async fn create(&self, input: &PrescriptionInput) -> DbResult<Prescription> {
        let now = Utc::now();
        input.validate(now.date_naive())?;

        debug!(customer_id = input.customer_id, doctor = %input.doctor_name, "Creating prescription");

        let result = sqlx::query(
            r#"
            INSERT INTO prescriptions (customer_id, doctor_name, prescription_date, notes, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            "#,
        )
        .bind(input.customer_id)
        .bind(input.doctor_name.trim())
        .bind(input.prescription_date)
        .bind(input.notes.as_deref().map(str::trim))
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::ForeignKeyViolation { .. } => DbError::not_found("Customer", input.customer_id),
            other => other,
        })?;

        let id = result.last_insert_rowid();
        info!(prescription_id = id, customer_id = input.customer_id, "Prescription created");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Prescription", id))
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Prescription>> {
        let prescription =
            sqlx::query_as(&format!("SELECT {} FROM prescriptions p WHERE p.id = ?1", COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(prescription)
    }

    pub async fn update(&self, id: i64, input: &PrescriptionInput) -> DbResult<Prescription> {
        let now = Utc::now();
        input.validate(now.date_naive())?;

        let result = sqlx::query(
            r#"
            UPDATE prescriptions
            SET customer_id = ?1, doctor_name = ?2, prescription_date = ?3, notes = ?4, updated_at = ?5
            WHERE id = ?6
            "#,
        )
        .bind(input.customer_id)
        .bind(input.doctor_name.trim())
        .bind(input.prescription_date)
        .bind(input.notes.as_deref().map(str::trim))
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::ForeignKeyViolation { .. } => DbError::not_found("Customer", input.customer_id),
            other => other,
        })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Prescription", id));
        }

        info!(prescription_id = id, "Prescription updated");

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Prescription", id))
    }

    /// Deletes a prescription and its items. Sales that referred to it
    /// keep their items and lose the link.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM prescriptions WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Prescription", id));
        }

        info!(prescription_id = id, "Prescription deleted");
        Ok(())
    }

    /// Lists prescriptions newest first, matching the search term against
    /// the customer's name or the doctor's name.
    pub async fn list(&self, search: &str, page: u32) -> DbResult<Page<Prescription>> {
        let window = PageWindow::new(page, self.listing.per_page);
        let pattern = like_pattern(search)?;

        let from_clause = r#"
            FROM prescriptions p
            JOIN customers c ON c.id = p.customer_id
            WHERE c.name LIKE ?1 ESCAPE '\' OR p.doctor_name LIKE ?1 ESCAPE '\'
        "#;

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) {}", from_clause))
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await?;

        let items = sqlx::query_as(&format!(
            "SELECT {} {} ORDER BY p.prescription_date DESC, p.id DESC LIMIT ?2 OFFSET ?3",
            COLUMNS, from_clause
        ))
        .bind(&pattern)
        .bind(window.limit())
        .bind(window.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(window.into_page(items, total))
    }

    /// Items of a prescription in the order they were added.
    pub async fn items(&self, prescription_id: i64) -> DbResult<Vec<PrescriptionItem>> {
        let items = sqlx::query_as(&format!(
            "SELECT {} FROM prescription_items WHERE prescription_id = ?1 ORDER BY id",
            ITEM_COLUMNS
        ))
        .bind(prescription_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// Adds a medicine line to a prescription.
    ///
    /// The quantity may not exceed the medicine's current stock. Stock is
    /// not reserved.
    pub async fn add_item(
        &self,
        prescription_id: i64,
        item: &NewPrescriptionItem,
    ) -> DbResult<PrescriptionItem> {
        item.validate()?;

        if self.get_by_id(prescription_id).await?.is_none() {
            return Err(DbError::not_found("Prescription", prescription_id));
        }

        let (name, available): (String, i64) =
            sqlx::query_as("SELECT name, stock_quantity FROM medicines WHERE id = ?1")
                .bind(item.medicine_id)
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| DbError::not_found("Medicine", item.medicine_id))?;

        check_reservation(&name, available, item.quantity)?;

        let result = sqlx::query(
            r#"
            INSERT INTO prescription_items (prescription_id, medicine_id, quantity, instructions, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(prescription_id)
        .bind(item.medicine_id)
        .bind(item.quantity)
        .bind(item.instructions.trim())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!(prescription_id, item_id = id, medicine_id = item.medicine_id, "Prescription item added");

        let created = sqlx::query_as(&format!(
            "SELECT {} FROM prescription_items WHERE id = ?1",
            ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    /// Removes one line from a prescription.
    pub async fn remove_item(&self, prescription_id: i64, item_id: i64) -> DbResult<()> {
        let result =
            sqlx::query("DELETE FROM prescription_items WHERE id = ?1 AND prescription_id = ?2")
                .bind(item_id)
                .bind(prescription_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Prescription item", item_id));
        }

        debug!(prescription_id, item_id, "Prescription item removed");
        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM prescriptions")
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
    use crate::repository::test_support::{seed_customer, seed_medicine};
    use chrono::Duration;

    fn input(customer_id: i64, doctor: &str, days_ago: i64) -> PrescriptionInput {
        PrescriptionInput {
            customer_id,
            doctor_name: doctor.to_string(),
            prescription_date: Utc::now().date_naive() - Duration::days(days_ago),
            notes: None,
        }
    }

    fn line(medicine_id: i64, quantity: i64) -> NewPrescriptionItem {
        NewPrescriptionItem {
            medicine_id,
            quantity,
            instructions: "Twice daily after meals".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_update() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customer = seed_customer(&db, "Jane Doe", "jane@example.com").await;
        let repo = db.prescriptions();

        let created = repo.create(&input(customer.id, "Dr. House", 2)).await.unwrap();
        assert_eq!(created.doctor_name, "Dr. House");

        let mut edit = input(customer.id, "Dr. Wilson", 1);
        edit.notes = Some("Follow-up in two weeks".to_string());
        let updated = repo.update(created.id, &edit).await.unwrap();
        assert_eq!(updated.doctor_name, "Dr. Wilson");
        assert_eq!(updated.notes.as_deref(), Some("Follow-up in two weeks"));
    }

    #[tokio::test]
    async fn test_future_date_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customer = seed_customer(&db, "Jane Doe", "jane@example.com").await;

        let err = db
            .prescriptions()
            .create(&input(customer.id, "Dr. House", -1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_unknown_customer() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db
            .prescriptions()
            .create(&input(42, "Dr. House", 0))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_items_checked_against_stock_without_moving_it() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customer = seed_customer(&db, "Jane Doe", "jane@example.com").await;
        let medicine = seed_medicine(&db, "Amoxicillin", 20, 800).await;
        let repo = db.prescriptions();
        let prescription = repo.create(&input(customer.id, "Dr. House", 0)).await.unwrap();

        let item = repo.add_item(prescription.id, &line(medicine.id, 20)).await.unwrap();
        assert_eq!(item.quantity, 20);

        let err = repo
            .add_item(prescription.id, &line(medicine.id, 21))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientStock);

        let stored = db.medicines().get_by_id(medicine.id).await.unwrap().unwrap();
        assert_eq!(stored.stock_quantity, 20);
        assert_eq!(repo.items(prescription.id).await.unwrap().len(), 1);

        repo.remove_item(prescription.id, item.id).await.unwrap();
        assert!(repo.items(prescription.id).await.unwrap().is_empty());
        assert_eq!(
            repo.remove_item(prescription.id, item.id).await.unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[tokio::test]
    async fn test_customer_delete_cascades() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customer = seed_customer(&db, "Jane Doe", "jane@example.com").await;
        let medicine = seed_medicine(&db, "Amoxicillin", 20, 800).await;
        let prescription = db
            .prescriptions()
            .create(&input(customer.id, "Dr. House", 0))
            .await
            .unwrap();
        db.prescriptions()
            .add_item(prescription.id, &line(medicine.id, 2))
            .await
            .unwrap();

        db.customers().delete(customer.id).await.unwrap();
        assert_eq!(db.prescriptions().count().await.unwrap(), 0);
        assert!(db.prescriptions().items(prescription.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_prescribed_medicine_cannot_be_deleted() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customer = seed_customer(&db, "Jane Doe", "jane@example.com").await;
        let medicine = seed_medicine(&db, "Amoxicillin", 20, 800).await;
        let prescription = db
            .prescriptions()
            .create(&input(customer.id, "Dr. House", 0))
            .await
            .unwrap();
        db.prescriptions()
            .add_item(prescription.id, &line(medicine.id, 2))
            .await
            .unwrap();

        let err = db.medicines().delete(medicine.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Integrity);
    }

    #[tokio::test]
    async fn test_list_newest_first_and_search() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let jane = seed_customer(&db, "Jane Doe", "jane@example.com").await;
        let john = seed_customer(&db, "John Roe", "john@example.com").await;
        let repo = db.prescriptions();

        repo.create(&input(jane.id, "Dr. House", 10)).await.unwrap();
        repo.create(&input(john.id, "Dr. Wilson", 1)).await.unwrap();
        repo.create(&input(jane.id, "Dr. Cuddy", 5)).await.unwrap();

        let all = repo.list("", 1).await.unwrap();
        let doctors: Vec<&str> = all.items.iter().map(|p| p.doctor_name.as_str()).collect();
        assert_eq!(doctors, vec!["Dr. Wilson", "Dr. Cuddy", "Dr. House"]);

        assert_eq!(repo.list("jane", 1).await.unwrap().total, 2);
        assert_eq!(repo.list("wilson", 1).await.unwrap().total, 1);
    }
}
