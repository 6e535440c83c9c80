//! # Stock Ledger Rules
//!
//! The arithmetic half of the stock ledger. The store-backed half lives in
//! `mortar_db::ledger` and applies the same rule with a conditional UPDATE.
//!
//! ## Ledger Movements
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   stock_quantity = baseline − Σ(live sale item quantities)              │
//! │                                                                         │
//! │   add sale item (qty)     ──► reserve(qty)   stock -= qty               │
//! │                                  └── qty > stock? InsufficientStock     │
//! │   remove sale item (qty)  ──► release(qty)   stock += qty               │
//! │   delete sale             ──► release(qty) once per item                │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::Medicine;
use crate::validation::validate_line_quantity;

/// Checks that `requested` units can be taken from `available`.
///
/// ## Example
/// ```rust
/// use mortar_core::stock::check_reservation;
///
/// assert!(check_reservation("Aspirin", 100, 30).is_ok());
/// assert!(check_reservation("Aspirin", 5, 10).is_err());
/// ```
pub fn check_reservation(medicine: &str, available: i64, requested: i64) -> CoreResult<()> {
    validate_line_quantity(requested)?;

    if requested > available {
        return Err(CoreError::InsufficientStock {
            medicine: medicine.to_string(),
            available,
            requested,
        });
    }

    Ok(())
}

/// Takes `qty` units out of an in-memory medicine.
///
/// On error the medicine is left untouched. Returns the new stock level.
pub fn reserve(medicine: &mut Medicine, qty: i64) -> CoreResult<i64> {
    check_reservation(&medicine.name, medicine.stock_quantity, qty)?;
    medicine.stock_quantity -= qty;
    Ok(medicine.stock_quantity)
}

/// Puts `qty` units back into an in-memory medicine.
///
/// Must only be called for a quantity previously taken by [`reserve`].
pub fn release(medicine: &mut Medicine, qty: i64) -> CoreResult<i64> {
    validate_line_quantity(qty)?;
    medicine.stock_quantity += qty;
    Ok(medicine.stock_quantity)
}

// =============================================================================
// Stock Level
// =============================================================================

/// Where a medicine's stock sits relative to its reorder level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    OutOfStock,
    /// At or below the reorder level.
    Low,
    Ok,
}

impl StockLevel {
    pub fn classify(stock_quantity: i64, reorder_level: i64) -> Self {
        if stock_quantity <= 0 {
            StockLevel::OutOfStock
        } else if stock_quantity <= reorder_level {
            StockLevel::Low
        } else {
            StockLevel::Ok
        }
    }
}

impl Medicine {
    pub fn stock_level(&self) -> StockLevel {
        StockLevel::classify(self.stock_quantity, self.reorder_level)
    }
}
