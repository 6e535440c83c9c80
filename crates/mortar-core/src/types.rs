//! # Domain Types
//!
//! Core domain types used throughout Mortar.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Medicine     │   │      Sale       │   │  Prescription   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │◄──│  invoice_number │──►│  customer_id    │       │
//! │  │  price_cents    │   │  status         │   │  doctor_name    │       │
//! │  │  stock_quantity │   │  total_cents    │   │  items[]        │       │
//! │  │  version        │   │  items[]        │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   Customer      │   │   Employee      │   │   Supplier      │       │
//! │  │   email unique  │   │   position      │   │   email unique  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every entity has an integer `id` assigned by the store. Sales also carry
//! a human-readable `invoice_number`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::DEFAULT_REORDER_LEVEL;

// =============================================================================
// Medicine Category
// =============================================================================

/// Therapeutic category of a medicine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MedicineCategory {
    Antibiotics,
    Analgesics,
    Antiviral,
    Antihistamine,
    Cardiovascular,
    Diabetes,
    Supplements,
    Other,
}

impl MedicineCategory {
    /// Every category, in display order.
    pub const ALL: [MedicineCategory; 8] = [
        MedicineCategory::Antibiotics,
        MedicineCategory::Analgesics,
        MedicineCategory::Antiviral,
        MedicineCategory::Antihistamine,
        MedicineCategory::Cardiovascular,
        MedicineCategory::Diabetes,
        MedicineCategory::Supplements,
        MedicineCategory::Other,
    ];

    /// Stored representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MedicineCategory::Antibiotics => "antibiotics",
            MedicineCategory::Analgesics => "analgesics",
            MedicineCategory::Antiviral => "antiviral",
            MedicineCategory::Antihistamine => "antihistamine",
            MedicineCategory::Cardiovascular => "cardiovascular",
            MedicineCategory::Diabetes => "diabetes",
            MedicineCategory::Supplements => "supplements",
            MedicineCategory::Other => "other",
        }
    }
}

impl fmt::Display for MedicineCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MedicineCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        MedicineCategory::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "category".to_string(),
                allowed: MedicineCategory::ALL
                    .iter()
                    .map(|c| c.as_str().to_string())
                    .collect(),
            })
    }
}

// =============================================================================
// Medicine
// =============================================================================

/// A medicine held in stock.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Medicine {
    pub id: i64,

    /// Display name; unique together with `manufacturer`.
    pub name: String,

    pub description: Option<String>,

    pub manufacturer: String,

    pub category: MedicineCategory,

    /// List price in cents.
    pub price_cents: i64,

    /// Units on hand. Never negative.
    pub stock_quantity: i64,

    /// Stock level at or below which the medicine needs reordering.
    pub reorder_level: i64,

    #[ts(as = "String")]
    pub expiry_date: NaiveDate,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,

    /// Optimistic concurrency counter, bumped on every write to the row.
    pub version: i64,
}

impl Medicine {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// True once the expiry date has passed.
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date < today
    }

    /// True when stock is at or below the reorder level.
    pub fn needs_reorder(&self) -> bool {
        self.stock_quantity <= self.reorder_level
    }
}

/// Fields for creating a medicine.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewMedicine {
    pub name: String,
    pub description: Option<String>,
    pub manufacturer: String,
    pub category: MedicineCategory,
    pub price_cents: i64,
    pub stock_quantity: i64,
    #[serde(default = "default_reorder_level")]
    pub reorder_level: i64,
    #[ts(as = "String")]
    pub expiry_date: NaiveDate,
}

fn default_reorder_level() -> i64 {
    DEFAULT_REORDER_LEVEL
}

/// Edit of an existing medicine.
///
/// `expected_version` is the version the editor read; the update is
/// rejected if the row has moved on since.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MedicineUpdate {
    pub name: String,
    pub description: Option<String>,
    pub manufacturer: String,
    pub category: MedicineCategory,
    pub price_cents: i64,
    pub stock_quantity: i64,
    pub reorder_level: i64,
    #[ts(as = "String")]
    pub expiry_date: NaiveDate,
    pub expected_version: i64,
}

/// Listing filter for medicines.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedicineFilter {
    /// Substring matched against name, manufacturer and category.
    pub search: String,
    /// Exact category match.
    pub category: Option<MedicineCategory>,
}

// =============================================================================
// Customer / Employee / Supplier
// =============================================================================

/// A pharmacy customer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub phone: String,
    pub email: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating or editing a customer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerInput {
    pub name: String,
    pub address: Option<String>,
    pub phone: String,
    pub email: String,
}

/// Job role of an employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum EmployeePosition {
    Pharmacist,
    Technician,
    Cashier,
    Manager,
    Assistant,
    Intern,
}

impl EmployeePosition {
    pub const ALL: [EmployeePosition; 6] = [
        EmployeePosition::Pharmacist,
        EmployeePosition::Technician,
        EmployeePosition::Cashier,
        EmployeePosition::Manager,
        EmployeePosition::Assistant,
        EmployeePosition::Intern,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            EmployeePosition::Pharmacist => "pharmacist",
            EmployeePosition::Technician => "technician",
            EmployeePosition::Cashier => "cashier",
            EmployeePosition::Manager => "manager",
            EmployeePosition::Assistant => "assistant",
            EmployeePosition::Intern => "intern",
        }
    }
}

impl fmt::Display for EmployeePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmployeePosition {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        EmployeePosition::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "position".to_string(),
                allowed: EmployeePosition::ALL
                    .iter()
                    .map(|p| p.as_str().to_string())
                    .collect(),
            })
    }
}

/// A pharmacy employee.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Employee {
    pub id: i64,
    pub name: String,
    pub position: EmployeePosition,
    pub phone: String,
    pub email: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating or editing an employee.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EmployeeInput {
    pub name: String,
    pub position: EmployeePosition,
    pub phone: String,
    pub email: String,
}

/// A medicine supplier.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Supplier {
    pub id: i64,
    pub name: String,
    pub address: Option<String>,
    pub phone: String,
    pub email: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating or editing a supplier.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SupplierInput {
    pub name: String,
    pub address: Option<String>,
    pub phone: String,
    pub email: String,
}

// =============================================================================
// Prescription
// =============================================================================

/// A doctor's prescription for a customer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Prescription {
    pub id: i64,
    pub customer_id: i64,
    pub doctor_name: String,
    #[ts(as = "String")]
    pub prescription_date: NaiveDate,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating or editing a prescription.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PrescriptionInput {
    pub customer_id: i64,
    pub doctor_name: String,
    #[ts(as = "String")]
    pub prescription_date: NaiveDate,
    pub notes: Option<String>,
}

/// A medicine line on a prescription. Prescribing does not move stock.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PrescriptionItem {
    pub id: i64,
    pub prescription_id: i64,
    pub medicine_id: i64,
    pub quantity: i64,
    pub instructions: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Fields for adding a prescription line.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewPrescriptionItem {
    pub medicine_id: i64,
    pub quantity: i64,
    pub instructions: String,
}

// =============================================================================
// Sale Status
// =============================================================================

/// Lifecycle state of a sale.
///
/// ```text
///   Draft ──add_item──► Active ──finalize──► Finalized
///     ▲                   │
///     └──remove last item─┘
/// ```
/// A sale in any state can be deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// No items yet.
    Draft,
    /// At least one item; items may still change.
    Active,
    /// Closed for item changes.
    Finalized,
}

impl SaleStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Draft => "draft",
            SaleStatus::Active => "active",
            SaleStatus::Finalized => "finalized",
        }
    }

    /// Whether items may be added to or removed from a sale in this state.
    #[inline]
    pub const fn accepts_item_changes(&self) -> bool {
        !matches!(self, SaleStatus::Finalized)
    }
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Draft
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A sale to a customer, handled by an employee.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: i64,
    pub invoice_number: String,
    pub customer_id: i64,
    pub employee_id: i64,
    pub prescription_id: Option<i64>,
    #[ts(as = "String")]
    pub sale_date: DateTime<Utc>,
    pub status: SaleStatus,
    /// Σ(unit price × quantity) over the sale's items, in cents.
    pub total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    /// Returns the total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// Header fields of a sale, used both to open a sale and to edit one
/// that has no items yet.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleHeader {
    pub customer_id: i64,
    pub employee_id: i64,
    pub prescription_id: Option<i64>,
    #[ts(as = "String")]
    pub sale_date: DateTime<Utc>,
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line item in a sale.
///
/// The unit price is a snapshot taken when the item is added and does not
/// follow later edits of the medicine's list price.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: i64,
    pub sale_id: i64,
    pub medicine_id: i64,
    pub quantity: i64,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Unit price × quantity.
    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }
}

/// Fields for adding a sale line.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSaleItem {
    pub medicine_id: i64,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

/// A sale together with its items.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleDetail {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

// =============================================================================
// User
// =============================================================================

/// A login account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Argon2 PHC string. Never serialized.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields for registering a user.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
}

// =============================================================================
// Query Payloads
// =============================================================================

/// One page of a listing.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number.
    pub page: u32,
    pub per_page: u32,
    /// Rows matching the filter across all pages.
    pub total: i64,
}

impl<T> Page<T> {
    /// Number of pages needed for `total` rows.
    pub fn pages(&self) -> i64 {
        if self.per_page == 0 {
            return 0;
        }
        let per_page = i64::from(self.per_page);
        (self.total + per_page - 1) / per_page
    }

    pub fn has_next(&self) -> bool {
        i64::from(self.page) < self.pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

/// Price lookup answer for a single medicine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriceQuote {
    /// List price in major units.
    pub price: f64,
    pub stock_quantity: i64,
}

impl From<&Medicine> for PriceQuote {
    fn from(medicine: &Medicine) -> Self {
        PriceQuote {
            price: medicine.price().to_major_f64(),
            stock_quantity: medicine.stock_quantity,
        }
    }
}

/// Search hit for the medicine picker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MedicineHit {
    pub id: i64,
    pub name: String,
    /// List price in major units.
    pub price: f64,
    pub stock_quantity: i64,
}

impl From<&Medicine> for MedicineHit {
    fn from(medicine: &Medicine) -> Self {
        MedicineHit {
            id: medicine.id,
            name: medicine.name.clone(),
            price: medicine.price().to_major_f64(),
            stock_quantity: medicine.stock_quantity,
        }
    }
}

/// Row counts shown on the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DashboardCounts {
    pub medicines: i64,
    pub customers: i64,
    pub employees: i64,
    pub prescriptions: i64,
    pub sales: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn medicine(price_cents: i64, stock: i64) -> Medicine {
        let now = Utc::now();
        Medicine {
            id: 7,
            name: "Amoxicillin".to_string(),
            description: None,
            manufacturer: "Acme Pharma".to_string(),
            category: MedicineCategory::Antibiotics,
            price_cents,
            stock_quantity: stock,
            reorder_level: DEFAULT_REORDER_LEVEL,
            expiry_date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    #[test]
    fn test_sale_status_default() {
        assert_eq!(SaleStatus::default(), SaleStatus::Draft);
        assert!(SaleStatus::Active.accepts_item_changes());
        assert!(!SaleStatus::Finalized.accepts_item_changes());
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(
            "Antibiotics".parse::<MedicineCategory>().unwrap(),
            MedicineCategory::Antibiotics
        );
        let err = "homeopathy".parse::<MedicineCategory>().unwrap_err();
        assert_eq!(err.field(), "category");
    }

    #[test]
    fn test_position_parse() {
        assert_eq!(
            "cashier".parse::<EmployeePosition>().unwrap(),
            EmployeePosition::Cashier
        );
        assert!("janitor".parse::<EmployeePosition>().is_err());
    }

    #[test]
    fn test_price_quote_json_shape() {
        let quote = PriceQuote::from(&medicine(1250, 40));
        let json = serde_json::to_value(&quote).unwrap();
        assert_eq!(json, serde_json::json!({ "price": 12.5, "stock_quantity": 40 }));
    }

    #[test]
    fn test_medicine_hit_json_shape() {
        let hit = MedicineHit::from(&medicine(1000, 3));
        let json = serde_json::to_value(&hit).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "id": 7, "name": "Amoxicillin", "price": 10.0, "stock_quantity": 3 })
        );
    }

    #[test]
    fn test_page_math() {
        let page: Page<i64> = Page {
            items: vec![],
            page: 2,
            per_page: 10,
            total: 21,
        };
        assert_eq!(page.pages(), 3);
        assert!(page.has_next());
        assert!(page.has_prev());
    }

    #[test]
    fn test_sale_item_line_total() {
        let item = SaleItem {
            id: 1,
            sale_id: 1,
            medicine_id: 7,
            quantity: 30,
            unit_price_cents: 1000,
            created_at: Utc::now(),
        };
        assert_eq!(item.line_total().cents(), 30_000);
    }

    #[test]
    fn test_user_hash_not_serialized() {
        let user = User {
            id: 1,
            username: "admin".to_string(),
            email: "admin@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            is_admin: true,
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
    }
}
