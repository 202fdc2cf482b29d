//! Input validation helpers
//!
//! Centralized text length constants and validation functions.
//! Limits are chosen based on:
//! - 40-column ticket width (names wrap, notes are printed on their own line)
//! - Reasonable UX limits for names and notes

use crate::utils::AppError;

// ── Text length limits ──────────────────────────────────────────────

/// Menu item and customer names
pub const MAX_NAME_LEN: usize = 200;

/// Special instructions and other free-form notes
pub const MAX_NOTE_LEN: usize = 500;

/// Maximum allowed unit price
pub const MAX_PRICE: f64 = 1_000_000.0;

/// Maximum allowed quantity per item
pub const MAX_QUANTITY: i32 = 9999;

// ── Validation helpers ──────────────────────────────────────────────

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty"))
            .with_detail("field", field));
    }
    if value.len() > max_len {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.len()
        ))
        .with_detail("field", field));
    }
    Ok(())
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), AppError> {
    if let Some(v) = value
        && v.len() > max_len
    {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            v.len()
        ))
        .with_detail("field", field));
    }
    Ok(())
}

/// Validate a money-like value: finite, non-negative, at most `max`.
pub fn validate_amount(value: f64, field: &str, max: f64) -> Result<(), AppError> {
    if !value.is_finite() {
        return Err(AppError::validation(format!(
            "{field} must be a finite number, got {value}"
        ))
        .with_detail("field", field));
    }
    if value < 0.0 {
        return Err(AppError::validation(format!(
            "{field} must be non-negative, got {value}"
        ))
        .with_detail("field", field));
    }
    if value > max {
        return Err(AppError::with_message(
            shared::error::ErrorCode::ValueOutOfRange,
            format!("{field} exceeds maximum allowed ({max}), got {value}"),
        )
        .with_detail("field", field));
    }
    Ok(())
}

/// Validate an item quantity: strictly positive and bounded.
pub fn validate_quantity(quantity: i32, field: &str) -> Result<(), AppError> {
    if quantity <= 0 {
        return Err(AppError::validation(format!(
            "{field} must be positive, got {quantity}"
        ))
        .with_detail("field", field));
    }
    if quantity > MAX_QUANTITY {
        return Err(AppError::with_message(
            shared::error::ErrorCode::ValueOutOfRange,
            format!("{field} exceeds maximum allowed ({MAX_QUANTITY}), got {quantity}"),
        )
        .with_detail("field", field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::error::ErrorCode;

    #[test]
    fn test_required_text() {
        assert!(validate_required_text("Burger", "item_name", MAX_NAME_LEN).is_ok());
        assert!(validate_required_text("   ", "item_name", MAX_NAME_LEN).is_err());
        let long = "x".repeat(MAX_NAME_LEN + 1);
        let err = validate_required_text(&long, "item_name", MAX_NAME_LEN).unwrap_err();
        assert_eq!(err.details.unwrap()["field"], "item_name");
    }

    #[test]
    fn test_optional_text() {
        assert!(validate_optional_text(&None, "note", MAX_NOTE_LEN).is_ok());
        assert!(validate_optional_text(&Some("no onions".into()), "note", MAX_NOTE_LEN).is_ok());
        assert!(validate_optional_text(&Some("x".repeat(501)), "note", MAX_NOTE_LEN).is_err());
    }

    #[test]
    fn test_amount() {
        assert!(validate_amount(0.0, "unit_price", MAX_PRICE).is_ok());
        assert!(validate_amount(-0.01, "unit_price", MAX_PRICE).is_err());
        assert!(validate_amount(f64::NAN, "unit_price", MAX_PRICE).is_err());
        assert!(validate_amount(f64::INFINITY, "unit_price", MAX_PRICE).is_err());
        let err = validate_amount(2_000_000.0, "unit_price", MAX_PRICE).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValueOutOfRange);
    }

    #[test]
    fn test_quantity() {
        assert!(validate_quantity(1, "quantity").is_ok());
        assert!(validate_quantity(0, "quantity").unwrap_err().is_validation());
        assert!(validate_quantity(-3, "quantity").is_err());
        assert!(validate_quantity(MAX_QUANTITY + 1, "quantity").is_err());
    }
}
