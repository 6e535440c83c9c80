//! # Seed Data Generator
//!
//! Populates an empty database with demo data for development.
//!
//! ## Usage
//! ```bash
//! # Use the configured database (mortar.toml / MORTAR_DB_PATH)
//! cargo run -p mortar-db --bin seed
//!
//! # Specify database path
//! cargo run -p mortar-db --bin seed -- --db ./data/mortar.db
//!
//! # Specify config file
//! cargo run -p mortar-db --bin seed -- --config ./mortar.toml
//! ```
//!
//! ## Generated Data
//! - Medicines across every category, with a few below their reorder level
//! - Customers, employees and suppliers
//!
//! Tables that already have rows are left alone.

use std::env;
use std::path::PathBuf;

use chrono::{Duration, Utc};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use mortar_core::{
    CustomerInput, EmployeeInput, EmployeePosition, MedicineCategory, NewMedicine, SupplierInput,
};
use mortar_db::{AppConfig, Database};

/// (name, manufacturer, category, price in cents, stock)
const MEDICINES: &[(&str, &str, MedicineCategory, i64, i64)] = &[
    ("Amoxicillin 500mg", "Sandoz", MedicineCategory::Antibiotics, 1299, 120),
    ("Azithromycin 250mg", "Pfizer", MedicineCategory::Antibiotics, 1850, 45),
    ("Ciprofloxacin 500mg", "Bayer", MedicineCategory::Antibiotics, 1425, 6),
    ("Paracetamol 500mg", "GSK", MedicineCategory::Analgesics, 399, 500),
    ("Ibuprofen 200mg", "Reckitt", MedicineCategory::Analgesics, 549, 320),
    ("Naproxen 250mg", "Bayer", MedicineCategory::Analgesics, 799, 8),
    ("Aciclovir 400mg", "Teva", MedicineCategory::Antiviral, 2150, 30),
    ("Oseltamivir 75mg", "Roche", MedicineCategory::Antiviral, 3499, 0),
    ("Cetirizine 10mg", "Johnson & Johnson", MedicineCategory::Antihistamine, 475, 210),
    ("Loratadine 10mg", "Bayer", MedicineCategory::Antihistamine, 525, 95),
    ("Atorvastatin 20mg", "Pfizer", MedicineCategory::Cardiovascular, 1599, 140),
    ("Amlodipine 5mg", "Teva", MedicineCategory::Cardiovascular, 899, 4),
    ("Metformin 500mg", "Merck", MedicineCategory::Diabetes, 650, 260),
    ("Gliclazide 80mg", "Servier", MedicineCategory::Diabetes, 975, 55),
    ("Vitamin D3 1000IU", "Nature's Bounty", MedicineCategory::Supplements, 1199, 180),
    ("Omega-3 Fish Oil", "Nature's Bounty", MedicineCategory::Supplements, 1499, 75),
    ("Oral Rehydration Salts", "Sandoz", MedicineCategory::Other, 299, 9),
];

/// (name, phone, email)
const CUSTOMERS: &[(&str, &str, &str)] = &[
    ("Jane Doe", "+1 555 010 0101", "jane.doe@example.com"),
    ("John Roe", "+1 555 010 0102", "john.roe@example.com"),
    ("Maria Garcia", "+1 555 010 0103", "maria.garcia@example.com"),
    ("Wei Chen", "+1 555 010 0104", "wei.chen@example.com"),
    ("Aisha Khan", "+1 555 010 0105", "aisha.khan@example.com"),
];

/// (name, position, phone, email)
const EMPLOYEES: &[(&str, EmployeePosition, &str, &str)] = &[
    ("Sam Carter", EmployeePosition::Pharmacist, "+1 555 020 0201", "sam.carter@example.com"),
    ("Priya Patel", EmployeePosition::Technician, "+1 555 020 0202", "priya.patel@example.com"),
    ("Tom O'Neil", EmployeePosition::Cashier, "+1 555 020 0203", "tom.oneil@example.com"),
    ("Lena Fischer", EmployeePosition::Manager, "+1 555 020 0204", "lena.fischer@example.com"),
];

/// (name, phone, email)
const SUPPLIERS: &[(&str, &str, &str)] = &[
    ("MedSupply & Co", "+1 555 030 0301", "orders@medsupply.example.com"),
    ("PharmaDistrib", "+1 555 030 0302", "sales@pharmadistrib.example.com"),
    ("HealthWholesale", "+1 555 030 0303", "hello@healthwholesale.example.com"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Mortar Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>        Database file path (overrides config)");
                println!("  -c, --config <PATH>    Config file path (default: platform config dir)");
                println!("  -h, --help             Show this help message");
                return Ok(());
            }
            other => warn!(argument = other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    let mut config = AppConfig::load(config_path)?;
    if let Some(path) = db_path {
        config.database.path = path;
    }

    info!(path = %config.database.path.display(), "Seeding database");

    let db = Database::new(config.db_config()).await?;

    let medicines = seed_medicines(&db).await?;
    let customers = seed_customers(&db).await?;
    let employees = seed_employees(&db).await?;
    let suppliers = seed_suppliers(&db).await?;

    let counts = db.dashboard_counts().await?;
    info!(
        medicines,
        customers,
        employees,
        suppliers,
        total_medicines = counts.medicines,
        total_customers = counts.customers,
        "Seed complete"
    );

    let low = db.medicines().low_stock().await?;
    for medicine in &low {
        info!(
            name = %medicine.name,
            stock = medicine.stock_quantity,
            reorder_level = medicine.reorder_level,
            "Low stock"
        );
    }

    db.close().await;
    Ok(())
}

async fn seed_medicines(db: &Database) -> Result<usize, Box<dyn std::error::Error>> {
    let existing = db.medicines().count().await?;
    if existing > 0 {
        warn!(existing, "Medicines already present, skipping");
        return Ok(0);
    }

    let today = Utc::now().date_naive();
    let mut created = 0;

    for (idx, (name, manufacturer, category, price_cents, stock)) in MEDICINES.iter().enumerate() {
        let medicine = NewMedicine {
            name: name.to_string(),
            description: None,
            manufacturer: manufacturer.to_string(),
            category: *category,
            price_cents: *price_cents,
            stock_quantity: *stock,
            reorder_level: 10,
            // Spread expiry dates over the next two years.
            expiry_date: today + Duration::days(90 + (idx as i64 * 41) % 640),
        };

        match db.medicines().create(&medicine).await {
            Ok(_) => created += 1,
            Err(e) => warn!(name = %name, error = %e, "Failed to insert medicine"),
        }
    }

    Ok(created)
}

async fn seed_customers(db: &Database) -> Result<usize, Box<dyn std::error::Error>> {
    if db.customers().count().await? > 0 {
        warn!("Customers already present, skipping");
        return Ok(0);
    }

    let mut created = 0;
    for (name, phone, email) in CUSTOMERS {
        let input = CustomerInput {
            name: name.to_string(),
            address: None,
            phone: phone.to_string(),
            email: email.to_string(),
        };
        match db.customers().create(&input).await {
            Ok(_) => created += 1,
            Err(e) => warn!(name = %name, error = %e, "Failed to insert customer"),
        }
    }
    Ok(created)
}

async fn seed_employees(db: &Database) -> Result<usize, Box<dyn std::error::Error>> {
    if db.employees().count().await? > 0 {
        warn!("Employees already present, skipping");
        return Ok(0);
    }

    let mut created = 0;
    for (name, position, phone, email) in EMPLOYEES {
        let input = EmployeeInput {
            name: name.to_string(),
            position: *position,
            phone: phone.to_string(),
            email: email.to_string(),
        };
        match db.employees().create(&input).await {
            Ok(_) => created += 1,
            Err(e) => warn!(name = %name, error = %e, "Failed to insert employee"),
        }
    }
    Ok(created)
}

async fn seed_suppliers(db: &Database) -> Result<usize, Box<dyn std::error::Error>> {
    if db.suppliers().count().await? > 0 {
        warn!("Suppliers already present, skipping");
        return Ok(0);
    }

    let mut created = 0;
    for (name, phone, email) in SUPPLIERS {
        let input = SupplierInput {
            name: name.to_string(),
            address: None,
            phone: phone.to_string(),
            email: email.to_string(),
        };
        match db.suppliers().create(&input).await {
            Ok(_) => created += 1,
            Err(e) => warn!(name = %name, error = %e, "Failed to insert supplier"),
        }
    }
    Ok(created)
}
