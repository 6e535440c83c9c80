//! # Line-Item Aggregator
//!
//! A sale's total is always derived from its items:
//!
//! ```text
//!   total = Σ(unit_price × quantity)
//! ```
//!
//! Totals are never adjusted incrementally. After any item change the
//! lifecycle reads the sale's full item set and calls [`recompute`].

use crate::money::Money;
use crate::types::{Sale, SaleItem};

/// Unit price × quantity.
#[inline]
pub fn line_total(unit_price: Money, quantity: i64) -> Money {
    unit_price.multiply_quantity(quantity)
}

/// Σ(unit price × quantity) over `items`.
///
/// ## Example
/// ```rust
/// use mortar_core::aggregate::sale_total;
///
/// assert!(sale_total(&[]).is_zero());
/// ```
pub fn sale_total(items: &[SaleItem]) -> Money {
    items
        .iter()
        .map(|item| line_total(item.unit_price(), item.quantity))
        .sum()
}

/// Sets `sale.total_cents` from `items` and returns the new total.
pub fn recompute(sale: &mut Sale, items: &[SaleItem]) -> Money {
    let total = sale_total(items);
    sale.total_cents = total.cents();
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SaleStatus;
    use chrono::Utc;

    fn item(id: i64, qty: i64, unit_price_cents: i64) -> SaleItem {
        SaleItem {
            id,
            sale_id: 1,
            medicine_id: id,
            quantity: qty,
            unit_price_cents,
            created_at: Utc::now(),
        }
    }

    fn sale() -> Sale {
        let now = Utc::now();
        Sale {
            id: 1,
            invoice_number: "INV-20261016-0001".to_string(),
            customer_id: 1,
            employee_id: 1,
            prescription_id: None,
            sale_date: now,
            status: SaleStatus::Active,
            total_cents: 999,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_line_total() {
        assert_eq!(line_total(Money::from_cents(1000), 30).cents(), 30_000);
        assert_eq!(line_total(Money::from_cents(0), 5).cents(), 0);
    }

    #[test]
    fn test_sale_total_sums_lines() {
        let items = [item(1, 30, 1000), item(2, 3, 299), item(3, 1, 1)];
        assert_eq!(sale_total(&items).cents(), 30_000 + 897 + 1);
    }

    #[test]
    fn test_recompute_overwrites_stale_total() {
        let mut s = sale();
        let total = recompute(&mut s, &[item(1, 2, 550)]);
        assert_eq!(total.cents(), 1100);
        assert_eq!(s.total_cents, 1100);

        recompute(&mut s, &[]);
        assert_eq!(s.total_cents, 0);
    }
}
