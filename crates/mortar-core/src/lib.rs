//! # mortar-core: Pure Business Logic for Mortar
//!
//! This crate holds the pharmacy domain as pure functions and plain types,
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Mortar Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                mortar-db (repositories, lifecycle)              │   │
//! │  │    add_item ─► reserve ─► insert item ─► recompute ─► commit    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ mortar-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │   stock   │  │ validation│  │   │
//! │  │   │ Medicine  │  │   Money   │  │ reserve   │  │   rules   │  │   │
//! │  │   │   Sale    │  │           │  │ release   │  │  checks   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                  ┌───────────┐                                  │   │
//! │  │                  │ aggregate │  Σ(unit price × quantity)        │   │
//! │  │                  └───────────┘                                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Example
//! ```rust
//! use mortar_core::aggregate::line_total;
//! use mortar_core::Money;
//!
//! // 30 units at $10.00
//! let total = line_total(Money::from_cents(1000), 30);
//! assert_eq!(total.cents(), 30_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aggregate;
pub mod error;
pub mod money;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity on a single sale or prescription line.
///
/// ## Business Reason
/// Catches typing 1000 instead of 10 at the counter.
pub const MAX_LINE_QUANTITY: i64 = 9_999;

/// Maximum stock or reorder level recorded for a medicine.
pub const MAX_STOCK_QUANTITY: i64 = 999_999;

/// Maximum unit price in cents ($999,999.99).
pub const MAX_PRICE_CENTS: i64 = 99_999_999;

/// Reorder level applied when none is given.
pub const DEFAULT_REORDER_LEVEL: i64 = 10;
