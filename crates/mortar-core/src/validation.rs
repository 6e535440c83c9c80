//! # Validation Module
//!
//! Input validation for Mortar records.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE                                                  │
//! │  ├── Field formats (names, phone, email, username, password)           │
//! │  ├── Ranges (quantity, price, stock, reorder level)                    │
//! │  └── Date rules (expiry, prescription date, sale date)                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: mortar-db repositories                                       │
//! │  └── Rules that need stored state (stock on hand, sale status)         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK constraints (stock >= 0, price >= 0)                        │
//! │  ├── UNIQUE constraints                                                │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use mortar_core::validation::{validate_line_quantity, validate_phone};
//!
//! validate_line_quantity(30).unwrap();
//! validate_phone("+1 (555) 123-4567").unwrap();
//! ```
//!
//! Date rules take `today` / `now` as arguments so callers decide the clock.

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::ValidationError;
use crate::types::{
    CustomerInput, EmployeeInput, MedicineUpdate, NewMedicine, NewPrescriptionItem, NewSaleItem,
    NewUser, PrescriptionInput, SaleHeader, SupplierInput,
};
use crate::{MAX_LINE_QUANTITY, MAX_PRICE_CENTS, MAX_STOCK_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum length of names (medicine, manufacturer, person, company, doctor).
pub const MAX_NAME_LEN: usize = 100;

/// Maximum length of free-text fields (description, notes, instructions).
pub const MAX_TEXT_LEN: usize = 500;

/// Maximum length of an address.
pub const MAX_ADDRESS_LEN: usize = 200;

/// Maximum length of an email address.
pub const MAX_EMAIL_LEN: usize = 100;

/// Maximum length of a phone number as typed.
pub const MAX_PHONE_LEN: usize = 20;

/// Password punctuation, at least one of which is required.
pub const PASSWORD_SPECIALS: &str = "@#$%^&+=";

// =============================================================================
// String Validators
// =============================================================================

fn required<'a>(field: &str, value: &'a str) -> ValidationResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(value)
}

fn max_len(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

fn optional_text(field: &str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    match value {
        Some(v) => max_len(field, v.trim(), max),
        None => Ok(()),
    }
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '\'' || c.is_whitespace()
}

/// Validates a person or medicine name.
///
/// ## Rules
/// - Required, at most 100 characters
/// - Letters, digits, spaces, hyphens, apostrophes and underscores only
///
/// ## Example
/// ```rust
/// use mortar_core::validation::validate_name;
///
/// assert!(validate_name("name", "Paracetamol 500mg").is_ok());
/// assert!(validate_name("name", "O'Brien-Smith").is_ok());
/// assert!(validate_name("name", "<b>x</b>").is_err());
/// ```
pub fn validate_name(field: &str, value: &str) -> ValidationResult<()> {
    let value = required(field, value)?;
    max_len(field, value, MAX_NAME_LEN)?;

    if !value.chars().all(is_name_char) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "may only contain letters, numbers, spaces, hyphens and apostrophes"
                .to_string(),
        });
    }

    Ok(())
}

/// Validates a company name (manufacturer, supplier).
///
/// Same as [`validate_name`] but also allows `&`.
pub fn validate_company_name(field: &str, value: &str) -> ValidationResult<()> {
    let value = required(field, value)?;
    max_len(field, value, MAX_NAME_LEN)?;

    if !value.chars().all(|c| is_name_char(c) || c == '&') {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "may only contain letters, numbers, spaces, hyphens, ampersands and apostrophes"
                .to_string(),
        });
    }

    Ok(())
}

/// Validates a prescribing doctor's name, optionally prefixed with "Dr.".
pub fn validate_doctor_name(value: &str) -> ValidationResult<()> {
    let value = required("doctor_name", value)?;
    max_len("doctor_name", value, MAX_NAME_LEN)?;

    let rest = value
        .strip_prefix("Dr.")
        .or_else(|| value.strip_prefix("Dr"))
        .unwrap_or(value)
        .trim_start();

    if rest.is_empty() || !rest.chars().all(is_name_char) {
        return Err(ValidationError::InvalidFormat {
            field: "doctor_name".to_string(),
            reason: "may only contain letters, spaces, hyphens and apostrophes, optionally prefixed with 'Dr.'"
                .to_string(),
        });
    }

    Ok(())
}

/// Validates a phone number.
///
/// ## Rules
/// - Required, at most 20 characters as typed
/// - Optional leading `+`, then digits, spaces, hyphens and parentheses
/// - Between 8 and 15 digits once punctuation is removed
///
/// ## Example
/// ```rust
/// use mortar_core::validation::validate_phone;
///
/// assert!(validate_phone("+44 20 7946 0958").is_ok());
/// assert!(validate_phone("12-34").is_err());
/// assert!(validate_phone("call me").is_err());
/// ```
pub fn validate_phone(value: &str) -> ValidationResult<()> {
    let value = required("phone", value)?;
    max_len("phone", value, MAX_PHONE_LEN)?;

    let body = value.strip_prefix('+').unwrap_or(value);
    if body.is_empty()
        || !body
            .chars()
            .all(|c| c.is_ascii_digit() || c == ' ' || c == '-' || c == '(' || c == ')')
    {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "invalid phone number format".to_string(),
        });
    }

    let digits = body.chars().filter(|c| c.is_ascii_digit()).count();
    if !(8..=15).contains(&digits) {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain between 8 and 15 digits".to_string(),
        });
    }

    Ok(())
}

/// Validates an email address.
///
/// ## Rules
/// - Required, at most 100 characters
/// - `local@domain.tld`: local part of letters, digits and `._%+-`;
///   domain of letters, digits, `.` and `-`; a final label of 2+ letters
pub fn validate_email(value: &str) -> ValidationResult<()> {
    let value = required("email", value)?;
    max_len("email", value, MAX_EMAIL_LEN)?;

    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "must be a valid email address".to_string(),
    };

    let (local, domain) = value.split_once('@').ok_or_else(invalid)?;

    if local.is_empty()
        || !local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c))
    {
        return Err(invalid());
    }

    let (host, tld) = domain.rsplit_once('.').ok_or_else(invalid)?;
    if host.is_empty()
        || !host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(invalid());
    }
    if tld.len() < 2 || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(invalid());
    }

    Ok(())
}

/// Validates a search query.
///
/// ## Rules
/// - Can be empty (no filter)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();
    max_len("query", query, 100)?;
    Ok(query.to_string())
}

// =============================================================================
// Credential Validators
// =============================================================================

/// Validates a username: 4-80 characters of letters, digits and `@ . + - _`.
pub fn validate_username(value: &str) -> ValidationResult<()> {
    let value = required("username", value)?;
    let len = value.chars().count();

    if len < 4 {
        return Err(ValidationError::TooShort {
            field: "username".to_string(),
            min: 4,
        });
    }
    max_len("username", value, 80)?;

    if !value
        .chars()
        .all(|c| c.is_alphanumeric() || "_.@+-".contains(c))
    {
        return Err(ValidationError::InvalidFormat {
            field: "username".to_string(),
            reason: "may only contain letters, numbers, and @/./+/-/_ characters".to_string(),
        });
    }

    Ok(())
}

/// Validates password strength.
///
/// ## Rules
/// - 8-128 characters
/// - At least one uppercase, one lowercase, one digit and one of `@#$%^&+=`
///
/// ## Example
/// ```rust
/// use mortar_core::validation::validate_password;
///
/// assert!(validate_password("Secret#2024").is_ok());
/// assert!(validate_password("secret2024").is_err());
/// ```
pub fn validate_password(value: &str) -> ValidationResult<()> {
    if value.is_empty() {
        return Err(ValidationError::Required {
            field: "password".to_string(),
        });
    }

    let len = value.chars().count();
    if len < 8 {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: 8,
        });
    }
    max_len("password", value, 128)?;

    let has_upper = value.chars().any(|c| c.is_uppercase());
    let has_lower = value.chars().any(|c| c.is_lowercase());
    let has_digit = value.chars().any(|c| c.is_ascii_digit());
    let has_special = value.chars().any(|c| PASSWORD_SPECIALS.contains(c));

    if !(has_upper && has_lower && has_digit && has_special) {
        return Err(ValidationError::InvalidFormat {
            field: "password".to_string(),
            reason: "must contain at least one uppercase letter, one lowercase letter, one number and one special character"
                .to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates the quantity of a sale or prescription line.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY (9,999)
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Sale: Add Item                                                         │
/// │                                                                         │
/// │  Pharmacist enters quantity: 30                                         │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_line_quantity(30) ← THIS FUNCTION                            │
/// │       │                                                                 │
/// │       ├── qty <= 0? → Error: "quantity must be positive"               │
/// │       ├── qty > 9999? → Error: "quantity must be between 1 and 9999"   │
/// │       └── OK → stock reservation                                       │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_line_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents.
///
/// ## Example
/// ```rust
/// use mortar_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents(1099).is_ok());
/// assert!(validate_price_cents(0).is_ok());
/// assert!(validate_price_cents(-100).is_err());
/// assert!(validate_price_cents(100_000_000).is_err());
/// ```
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    in_range("price", cents, 0, MAX_PRICE_CENTS)
}

/// Validates a stock quantity (0-999,999).
pub fn validate_stock_quantity(qty: i64) -> ValidationResult<()> {
    in_range("stock_quantity", qty, 0, MAX_STOCK_QUANTITY)
}

/// Validates a reorder level (0-999,999).
pub fn validate_reorder_level(level: i64) -> ValidationResult<()> {
    in_range("reorder_level", level, 0, MAX_STOCK_QUANTITY)
}

fn in_range(field: &str, value: i64, min: i64, max: i64) -> ValidationResult<()> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min,
            max,
        });
    }
    Ok(())
}

// =============================================================================
// Date Validators
// =============================================================================

/// Expiry dates must not lie in the past. Today is accepted.
pub fn validate_expiry_date(expiry: NaiveDate, today: NaiveDate) -> ValidationResult<()> {
    if expiry < today {
        return Err(ValidationError::DateInPast {
            field: "expiry_date".to_string(),
        });
    }
    Ok(())
}

/// Prescriptions cannot be dated in the future.
pub fn validate_prescription_date(date: NaiveDate, today: NaiveDate) -> ValidationResult<()> {
    if date > today {
        return Err(ValidationError::DateInFuture {
            field: "prescription_date".to_string(),
        });
    }
    Ok(())
}

/// Sales cannot be dated in the future.
pub fn validate_sale_date(date: DateTime<Utc>, now: DateTime<Utc>) -> ValidationResult<()> {
    if date > now {
        return Err(ValidationError::DateInFuture {
            field: "sale_date".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Record Validators
// =============================================================================

impl NewMedicine {
    /// Checks every field of a new medicine.
    pub fn validate(&self, today: NaiveDate) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        optional_text("description", self.description.as_deref(), MAX_TEXT_LEN)?;
        validate_company_name("manufacturer", &self.manufacturer)?;
        validate_price_cents(self.price_cents)?;
        validate_stock_quantity(self.stock_quantity)?;
        validate_reorder_level(self.reorder_level)?;
        validate_expiry_date(self.expiry_date, today)
    }
}

impl MedicineUpdate {
    /// Checks an edit. The expiry date is only held to the "not in the
    /// past" rule when it differs from `current_expiry`, so an already
    /// expired medicine can still have its stock corrected.
    pub fn validate(&self, today: NaiveDate, current_expiry: NaiveDate) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        optional_text("description", self.description.as_deref(), MAX_TEXT_LEN)?;
        validate_company_name("manufacturer", &self.manufacturer)?;
        validate_price_cents(self.price_cents)?;
        validate_stock_quantity(self.stock_quantity)?;
        validate_reorder_level(self.reorder_level)?;
        if self.expiry_date != current_expiry {
            validate_expiry_date(self.expiry_date, today)?;
        }
        Ok(())
    }
}

impl CustomerInput {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        optional_text("address", self.address.as_deref(), MAX_ADDRESS_LEN)?;
        validate_phone(&self.phone)?;
        validate_email(&self.email)
    }
}

impl EmployeeInput {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_name("name", &self.name)?;
        validate_phone(&self.phone)?;
        validate_email(&self.email)
    }
}

impl SupplierInput {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_company_name("name", &self.name)?;
        optional_text("address", self.address.as_deref(), MAX_ADDRESS_LEN)?;
        validate_phone(&self.phone)?;
        validate_email(&self.email)
    }
}

impl PrescriptionInput {
    pub fn validate(&self, today: NaiveDate) -> ValidationResult<()> {
        validate_doctor_name(&self.doctor_name)?;
        validate_prescription_date(self.prescription_date, today)?;
        optional_text("notes", self.notes.as_deref(), MAX_TEXT_LEN)
    }
}

impl NewPrescriptionItem {
    /// Field checks only; the stock ceiling needs the stored medicine.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_line_quantity(self.quantity)?;
        let instructions = required("instructions", &self.instructions)?;
        max_len("instructions", instructions, MAX_TEXT_LEN)
    }
}

impl SaleHeader {
    pub fn validate(&self, now: DateTime<Utc>) -> ValidationResult<()> {
        validate_sale_date(self.sale_date, now)
    }
}

impl NewSaleItem {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_line_quantity(self.quantity)?;
        validate_price_cents(self.unit_price_cents)
    }
}

impl NewUser {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_username(&self.username)?;
        validate_email(&self.email)?;
        validate_password(&self.password)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MedicineCategory;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn new_medicine() -> NewMedicine {
        NewMedicine {
            name: "Amoxicillin".to_string(),
            description: Some("Broad-spectrum antibiotic".to_string()),
            manufacturer: "Johnson & Johnson".to_string(),
            category: MedicineCategory::Antibiotics,
            price_cents: 1000,
            stock_quantity: 100,
            reorder_level: 10,
            expiry_date: today() + Duration::days(365),
        }
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("name", "Ibuprofen 200").is_ok());
        assert!(validate_name("name", "").is_err());
        assert!(validate_name("name", "   ").is_err());
        assert!(validate_name("name", &"A".repeat(101)).is_err());
        assert!(validate_name("name", "Tom & Jerry").is_err());
        assert!(validate_company_name("manufacturer", "Tom & Jerry").is_ok());
    }

    #[test]
    fn test_validate_doctor_name() {
        assert!(validate_doctor_name("Dr. Jane Smith").is_ok());
        assert!(validate_doctor_name("Jane O'Neil").is_ok());
        assert!(validate_doctor_name("Dr.").is_err());
        assert!(validate_doctor_name("Dr. <script>").is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("+1 (555) 123-4567").is_ok());
        assert!(validate_phone("0123456789").is_ok());
        assert!(validate_phone("1234567").is_err());
        assert!(validate_phone("1234567890123456").is_err());
        assert!(validate_phone("555-CALL-NOW").is_err());
        assert!(validate_phone("").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("jane.doe+rx@pharmacy.co.uk").is_ok());
        assert!(validate_email("no-at-sign.com").is_err());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("a@b.c").is_err());
        assert!(validate_email("@pharmacy.com").is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("pharm.admin").is_ok());
        assert!(validate_username("abc").is_err());
        assert!(validate_username("bad name").is_err());
        assert!(validate_username(&"a".repeat(81)).is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("Str0ng@pass").is_ok());
        assert!(validate_password("Sh0rt@").is_err());
        assert!(validate_password("nouppercase1@").is_err());
        assert!(validate_password("NOLOWERCASE1@").is_err());
        assert!(validate_password("NoDigits@@").is_err());
        assert!(validate_password("NoSpecial123").is_err());
    }

    #[test]
    fn test_validate_line_quantity() {
        assert!(validate_line_quantity(1).is_ok());
        assert!(validate_line_quantity(9_999).is_ok());
        assert!(validate_line_quantity(0).is_err());
        assert!(validate_line_quantity(-1).is_err());
        assert!(validate_line_quantity(10_000).is_err());
    }

    #[test]
    fn test_date_rules() {
        assert!(validate_expiry_date(today(), today()).is_ok());
        assert!(validate_expiry_date(today() - Duration::days(1), today()).is_err());

        assert!(validate_prescription_date(today(), today()).is_ok());
        assert!(validate_prescription_date(today() + Duration::days(1), today()).is_err());

        let now = Utc::now();
        assert!(validate_sale_date(now - Duration::hours(1), now).is_ok());
        assert!(validate_sale_date(now + Duration::hours(1), now).is_err());
    }

    #[test]
    fn test_new_medicine_validate() {
        assert!(new_medicine().validate(today()).is_ok());

        let mut expired = new_medicine();
        expired.expiry_date = today() - Duration::days(1);
        let err = expired.validate(today()).unwrap_err();
        assert_eq!(err.field(), "expiry_date");

        let mut negative = new_medicine();
        negative.stock_quantity = -1;
        assert!(negative.validate(today()).is_err());
    }

    #[test]
    fn test_medicine_update_keeps_past_expiry() {
        let past = today() - Duration::days(30);
        let m = new_medicine();
        let update = MedicineUpdate {
            name: m.name,
            description: m.description,
            manufacturer: m.manufacturer,
            category: m.category,
            price_cents: m.price_cents,
            stock_quantity: 5,
            reorder_level: m.reorder_level,
            expiry_date: past,
            expected_version: 1,
        };
        assert!(update.validate(today(), past).is_ok());
        assert!(update.validate(today(), today()).is_err());
    }

    #[test]
    fn test_prescription_item_requires_instructions() {
        let item = NewPrescriptionItem {
            medicine_id: 1,
            quantity: 2,
            instructions: "  ".to_string(),
        };
        assert_eq!(item.validate().unwrap_err().field(), "instructions");
    }
}
