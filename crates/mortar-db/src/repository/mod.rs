//! # Repository Module
//!
//! Database repository implementations for Mortar.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Caller                                                                │
//! │       │  db.medicines().list(&filter, 2)                               │
//! │       ▼                                                                 │
//! │  MedicineRepository                                                    │
//! │  ├── create / get_by_id / update / delete                              │
//! │  ├── list (search + pagination)                                        │
//! │  └── lookups (price quote, search hits, low stock)                     │
//! │       │  SQL                                                            │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Listings are 1-based pages of `Listing::per_page` rows. Search terms are
//! matched as case-insensitive substrings (`LIKE '%term%'`).
//!
//! ## Available Repositories
//!
//! - [`MedicineRepository`](medicine::MedicineRepository) - Catalogue, stock lookups
//! - [`CustomerRepository`](customer::CustomerRepository)
//! - [`EmployeeRepository`](employee::EmployeeRepository)
//! - [`SupplierRepository`](supplier::SupplierRepository)
//! - [`PrescriptionRepository`](prescription::PrescriptionRepository) - Prescriptions and their items
//! - [`SaleRepository`](sale::SaleRepository) - Sale lifecycle entry point
//! - [`UserRepository`](user::UserRepository) - Accounts and passwords

pub mod customer;
pub mod employee;
pub mod medicine;
pub mod prescription;
pub mod sale;
pub mod supplier;
pub mod user;

use mortar_core::validation::validate_search_query;
use mortar_core::Page;

use crate::error::DbResult;

/// A page request resolved to SQL bounds.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PageWindow {
    pub page: u32,
    pub per_page: u32,
}

impl PageWindow {
    /// Pages below 1 are treated as page 1.
    pub fn new(page: u32, per_page: u32) -> Self {
        PageWindow {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }

    pub fn into_page<T>(self, items: Vec<T>, total: i64) -> Page<T> {
        Page {
            items,
            page: self.page,
            per_page: self.per_page,
            total,
        }
    }
}

/// Turns a search term into a `LIKE` pattern, escaping `%`, `_` and `\`.
/// Use with `ESCAPE '\'`.
pub(crate) fn like_pattern(search: &str) -> DbResult<String> {
    let term = validate_search_query(search)?;
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    Ok(pattern)
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Fixtures shared by the repository tests.

    use chrono::{Duration, Utc};
    use mortar_core::{
        Customer, CustomerInput, Employee, EmployeeInput, EmployeePosition, Medicine,
        MedicineCategory, NewMedicine, Sale, SaleHeader,
    };

    use crate::pool::Database;

    pub async fn seed_medicine(db: &Database, name: &str, stock: i64, price_cents: i64) -> Medicine {
        db.medicines()
            .create(&NewMedicine {
                name: name.to_string(),
                description: None,
                manufacturer: "Acme Pharma".to_string(),
                category: MedicineCategory::Analgesics,
                price_cents,
                stock_quantity: stock,
                reorder_level: 10,
                expiry_date: Utc::now().date_naive() + Duration::days(365),
            })
            .await
            .unwrap()
    }

    pub async fn seed_customer(db: &Database, name: &str, email: &str) -> Customer {
        db.customers()
            .create(&CustomerInput {
                name: name.to_string(),
                address: Some("1 High Street".to_string()),
                phone: "+1 555 010 0100".to_string(),
                email: email.to_string(),
            })
            .await
            .unwrap()
    }

    pub async fn seed_employee(db: &Database, name: &str, email: &str) -> Employee {
        db.employees()
            .create(&EmployeeInput {
                name: name.to_string(),
                position: EmployeePosition::Pharmacist,
                phone: "+1 555 010 0200".to_string(),
                email: email.to_string(),
            })
            .await
            .unwrap()
    }

    /// A Draft sale with a fresh customer and employee.
    pub async fn seed_sale(db: &Database) -> Sale {
        let customer = seed_customer(db, "Jane Doe", "jane@example.com").await;
        let employee = seed_employee(db, "Sam Clerk", "sam@example.com").await;
        db.sales()
            .create(&SaleHeader {
                customer_id: customer.id,
                employee_id: employee.id,
                prescription_id: None,
                sale_date: Utc::now() - Duration::minutes(1),
            })
            .await
            .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes() {
        assert_eq!(like_pattern("  para ").unwrap(), "%para%");
        assert_eq!(like_pattern("50%_off").unwrap(), "%50\\%\\_off%");
        assert_eq!(like_pattern("").unwrap(), "%%");
        assert!(like_pattern(&"x".repeat(101)).is_err());
    }

    #[test]
    fn test_page_window() {
        let w = PageWindow::new(0, 10);
        assert_eq!(w.page, 1);
        assert_eq!(w.offset(), 0);

        let w = PageWindow::new(3, 10);
        assert_eq!(w.offset(), 20);
        assert_eq!(w.limit(), 10);
    }
}
