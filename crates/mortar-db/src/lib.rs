//! # mortar-db: Database Layer for Mortar
//!
//! This crate provides database access for the Mortar pharmacy system.
//! It uses SQLite for storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Mortar Data Flow                                 │
//! │                                                                         │
//! │  Caller (counter UI, API handler, seed binary)                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     mortar-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ medicine.rs   │    │  (embedded)  │  │   │
//! │  │   │ SqlitePool    │◄───│ sale.rs ...   │    │ 001_init.sql │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │                                │ one transaction per call      │   │
//! │  │                        ┌───────▼───────┐    ┌──────────────┐  │   │
//! │  │                        │  lifecycle.rs │───►│  ledger.rs   │  │   │
//! │  │                        │ add / remove  │    │ reserve /    │  │   │
//! │  │                        │ delete sale   │    │ release      │  │   │
//! │  │                        └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`config`] - TOML + environment configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`ledger`] - Stock reservations inside a transaction
//! - [`lifecycle`] - Sale state machine inside a transaction
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mortar_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("mortar.db")).await?;
//!
//! let sale = db.sales().create(&header).await?;
//! db.sales().add_item(sale.id, &NewSaleItem { medicine_id, quantity: 30, unit_price_cents: 1000 }).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{AppConfig, ConfigError};
pub use error::{DbError, DbResult, ErrorKind};
pub use pool::{Database, DbConfig, Listing};

// Repository re-exports for convenience
pub use repository::customer::CustomerRepository;
pub use repository::employee::EmployeeRepository;
pub use repository::medicine::MedicineRepository;
pub use repository::prescription::PrescriptionRepository;
pub use repository::sale::SaleRepository;
pub use repository::supplier::SupplierRepository;
pub use repository::user::UserRepository;
