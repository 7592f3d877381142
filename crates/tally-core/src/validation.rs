//! # Validation Module
//!
//! Input validation and parsing for Tally POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP extractors (axum Form / Json)                           │
//! │  └── Shape of the request (fields present, JSON well-formed)           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Required fields, lengths, formats                                 │
//! │  └── Form strings parsed into typed values (Money, dates, counts)      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── UNIQUE constraints (email, phone, product name)                   │
//! │  ├── CHECK constraints (stock >= 0, price >= 0)                        │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validators return the normalized value (trimmed, lowercased where that
//! matters) so callers store exactly what was checked.
//!
//! ## Usage
//! ```rust
//! use tally_core::validation::{parse_price, validate_pin};
//!
//! assert_eq!(parse_price("2.50").unwrap().cents(), 250);
//! assert!(validate_pin("12a4").is_err());
//! ```

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rand::Rng;

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_ITEM_QUANTITY, PIN_LENGTH, SKU_LENGTH};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Requires a non-blank value and returns it trimmed.
///
/// ## Example
/// ```rust
/// use tally_core::validation::require;
///
/// assert_eq!(require("name", Some("  Ana ")).unwrap(), "Ana");
/// assert!(require("name", Some("   ")).is_err());
/// assert!(require("name", None).is_err());
/// ```
pub fn require(field: &str, value: Option<&str>) -> ValidationResult<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ValidationError::required(field)),
    }
}

/// Trims an optional value, mapping blank to `None`.
pub fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Validates a display name (users, customers, products).
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
pub fn validate_name(field: &str, name: &str) -> ValidationResult<String> {
    let name = require(field, Some(name))?;

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(name)
}

/// Validates an email address and returns it lowercased.
///
/// Only the shape `local@domain` is checked; deliverability is not our
/// concern.
pub fn validate_email(email: &str) -> ValidationResult<String> {
    let email = require("email", Some(email))?.to_lowercase();

    if email.len() > 254 {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: 254,
        });
    }

    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !well_formed {
        return Err(ValidationError::invalid_format("email", "expected name@domain"));
    }

    Ok(email)
}

/// Validates a PIN: exactly four ASCII digits.
pub fn validate_pin(pin: &str) -> ValidationResult<String> {
    let pin = require("pin", Some(pin))?;

    if pin.len() != PIN_LENGTH || !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::invalid_format(
            "pin",
            format!("must be exactly {PIN_LENGTH} digits"),
        ));
    }

    Ok(pin)
}

/// Validates a phone number.
///
/// ## Rules
/// - Must not be empty
/// - Digits plus `+ - ( ) .` and spaces
/// - At least one digit, at most 32 characters
pub fn validate_phone(phone: &str) -> ValidationResult<String> {
    let phone = require("phone", Some(phone))?;

    if phone.len() > 32 {
        return Err(ValidationError::TooLong {
            field: "phone".to_string(),
            max: 32,
        });
    }

    let allowed = |c: char| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | '.' | ' ');
    if !phone.chars().all(allowed) || !phone.chars().any(|c| c.is_ascii_digit()) {
        return Err(ValidationError::invalid_format(
            "phone",
            "must contain digits and only + - ( ) . or spaces",
        ));
    }

    Ok(phone)
}

/// Validates a SKU (Stock Keeping Unit).
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Only alphanumeric characters, hyphens, underscores
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_sku;
///
/// assert!(validate_sku("COKE-330").is_ok());
/// assert!(validate_sku("").is_err());
/// assert!(validate_sku("A".repeat(100).as_str()).is_err());
/// ```
pub fn validate_sku(sku: &str) -> ValidationResult<String> {
    let sku = require("sku", Some(sku))?;

    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }

    if !sku
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::invalid_format(
            "sku",
            "must contain only letters, numbers, hyphens, and underscores",
        ));
    }

    Ok(sku)
}

/// Generates a random SKU of [`SKU_LENGTH`] uppercase alphanumerics.
///
/// Used when a product is added without one.
pub fn generate_sku() -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(SKU_LENGTH)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect()
}

/// Validates a search query.
///
/// ## Rules
/// - Can be empty (returns all results)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query, or `None` when blank.
pub fn validate_search_query(query: Option<&str>) -> ValidationResult<Option<String>> {
    let query = optional(query);

    if let Some(q) = &query {
        if q.chars().count() > 100 {
            return Err(ValidationError::TooLong {
                field: "search".to_string(),
                max: 100,
            });
        }
    }

    Ok(query)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an order line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Parses a price from a form field (`"2.50"`).
///
/// ## Rules
/// - Decimal with at most two places
/// - Must be non-negative (zero is allowed for free items)
pub fn parse_price(raw: &str) -> ValidationResult<Money> {
    let price = raw
        .parse::<Money>()
        .map_err(|e| ValidationError::invalid_format("price", e.to_string()))?;

    if price.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(price)
}

/// Parses a stock count from a form field.
pub fn parse_stock(raw: &str) -> ValidationResult<i64> {
    let stock: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ValidationError::invalid_format("stock", "must be a whole number"))?;

    if stock < 0 {
        return Err(ValidationError::OutOfRange {
            field: "stock".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(stock)
}

/// Parses a points amount for loyalty redemption.
pub fn validate_points(points: i64) -> ValidationResult<i64> {
    if points <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "points".to_string(),
        });
    }
    Ok(points)
}

// =============================================================================
// Date Validators
// =============================================================================

/// Parses a restock date from a form field.
///
/// ## Accepted Formats
/// ```text
/// 2024-03-01                 date input       → midnight UTC
/// 2024-03-01T09:30           datetime-local   → as UTC
/// 2024-03-01T09:30:00Z       RFC 3339         → converted to UTC
/// ```
pub fn parse_date(field: &str, raw: &str) -> ValidationResult<DateTime<Utc>> {
    let raw = require(field, Some(raw))?;

    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&raw, format) {
            return Ok(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }

    Err(ValidationError::invalid_format(
        field,
        "expected YYYY-MM-DD or an RFC 3339 timestamp",
    ))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_require_trims_and_rejects_blank() {
        assert_eq!(require("name", Some(" Ana ")).unwrap(), "Ana");
        assert!(matches!(
            require("name", Some("")),
            Err(ValidationError::Required { .. })
        ));
        assert!(require("name", None).is_err());
        assert_eq!(optional(Some("  ")), None);
        assert_eq!(optional(Some(" x ")), Some("x".to_string()));
    }

    #[test]
    fn test_validate_email() {
        assert_eq!(validate_email(" Ana@Example.COM ").unwrap(), "ana@example.com");
        assert!(validate_email("ana").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ana@").is_err());
        assert!(validate_email("a na@example.com").is_err());
        assert!(validate_email("a@b@c").is_err());
    }

    #[test]
    fn test_validate_pin() {
        assert_eq!(validate_pin("0420").unwrap(), "0420");
        assert!(validate_pin("123").is_err());
        assert!(validate_pin("12345").is_err());
        assert!(validate_pin("12a4").is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("+1 (555) 010-2000").is_ok());
        assert!(validate_phone("5550102").is_ok());
        assert!(validate_phone("").is_err());
        assert!(validate_phone("call me").is_err());
        assert!(validate_phone("---").is_err());
    }

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("COKE-330").is_ok());
        assert!(validate_sku("ABC123").is_ok());
        assert!(validate_sku("product_1").is_ok());

        assert!(validate_sku("").is_err());
        assert!(validate_sku("   ").is_err());
        assert!(validate_sku("has space").is_err());
        assert!(validate_sku(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_generate_sku() {
        let sku = generate_sku();
        assert_eq!(sku.len(), SKU_LENGTH);
        assert!(sku.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
        assert!(validate_sku(&sku).is_ok());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("2.50").unwrap().cents(), 250);
        assert_eq!(parse_price("0").unwrap().cents(), 0);
        assert!(parse_price("-1").is_err());
        assert!(parse_price("two").is_err());
        assert!(parse_price("").is_err());
    }

    #[test]
    fn test_parse_stock() {
        assert_eq!(parse_stock(" 10 ").unwrap(), 10);
        assert!(parse_stock("-1").is_err());
        assert!(parse_stock("1.5").is_err());
    }

    #[test]
    fn test_parse_date_formats() {
        let d = parse_date("last_restocked", "2024-03-01").unwrap();
        assert_eq!((d.year(), d.month(), d.day(), d.hour()), (2024, 3, 1, 0));

        let d = parse_date("last_restocked", "2024-03-01T09:30").unwrap();
        assert_eq!((d.hour(), d.minute()), (9, 30));

        let d = parse_date("last_restocked", "2024-03-01T09:30:00+02:00").unwrap();
        assert_eq!(d.hour(), 7);

        assert!(parse_date("last_restocked", "03/01/2024").is_err());
        assert!(parse_date("last_restocked", "").is_err());
    }

    #[test]
    fn test_search_query() {
        assert_eq!(validate_search_query(None).unwrap(), None);
        assert_eq!(validate_search_query(Some("  ")).unwrap(), None);
        assert_eq!(
            validate_search_query(Some(" bean ")).unwrap(),
            Some("bean".to_string())
        );
        assert!(validate_search_query(Some(&"x".repeat(101))).is_err());
    }
}
