//! Validation utilities for the packhouse platform

use rust_decimal::Decimal;

// ============================================================================
// Quantity Validations
// ============================================================================

/// Quantities and weights must be strictly positive
pub fn validate_positive(value: Decimal) -> Result<(), &'static str> {
    if value <= Decimal::ZERO {
        return Err("Value must be greater than zero");
    }
    Ok(())
}

/// Prices and costs may be zero but never negative
pub fn validate_non_negative(value: Decimal) -> Result<(), &'static str> {
    if value < Decimal::ZERO {
        return Err("Value cannot be negative");
    }
    Ok(())
}

/// Whole-unit supplies cannot be counted in fractions
pub fn validate_whole_quantity(value: Decimal) -> Result<(), &'static str> {
    if value.fract() != Decimal::ZERO {
        return Err("Quantity must be a whole number for this unit");
    }
    Ok(())
}

// ============================================================================
// General Validations
// ============================================================================

/// Names must contain something other than whitespace
pub fn validate_name(name: &str) -> Result<(), &'static str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Name cannot be empty");
    }
    if trimmed.chars().count() > 255 {
        return Err("Name must be at most 255 characters");
    }
    Ok(())
}

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') => {
            Ok(())
        }
        _ => Err("Invalid email format"),
    }
}

/// Validate organization code format (3-10 uppercase alphanumeric)
pub fn validate_organization_code(code: &str) -> Result<(), &'static str> {
    if code.len() < 3 {
        return Err("Organization code must be at least 3 characters");
    }
    if code.len() > 10 {
        return Err("Organization code must be at most 10 characters");
    }
    if !code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
        return Err("Organization code must be uppercase alphanumeric only");
    }
    Ok(())
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one digit");
    }
    Ok(())
}

/// Tax identifiers: 10-13 uppercase letters, digits or '&'
pub fn validate_tax_id(tax_id: &str) -> Result<(), &'static str> {
    let len = tax_id.chars().count();
    if !(10..=13).contains(&len) {
        return Err("Tax ID must be 10 to 13 characters");
    }
    if !tax_id
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '&')
    {
        return Err("Tax ID must be uppercase alphanumeric");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_positive() {
        assert!(validate_positive(Decimal::ONE).is_ok());
        assert!(validate_positive(Decimal::ZERO).is_err());
        assert!(validate_non_negative(Decimal::ZERO).is_ok());
        assert!(validate_non_negative(Decimal::NEGATIVE_ONE).is_err());
    }

    #[test]
    fn test_whole_quantity() {
        assert!(validate_whole_quantity(Decimal::from(12)).is_ok());
        assert!(validate_whole_quantity(Decimal::from_str("1.5").unwrap()).is_err());
    }

    #[test]
    fn test_names_and_codes() {
        assert!(validate_name("  ").is_err());
        assert!(validate_name("Huerta Norte").is_ok());
        assert!(validate_organization_code("PKH01").is_ok());
        assert!(validate_organization_code("pk").is_err());
        assert!(validate_organization_code("PK-01").is_err());
    }

    #[test]
    fn test_email_and_password() {
        assert!(validate_email("ops@packhouse.example").is_ok());
        assert!(validate_email("@packhouse.example").is_err());
        assert!(validate_email("ops@localhost").is_err());
        assert!(validate_password("packing2024").is_ok());
        assert!(validate_password("packing").is_err());
    }

    #[test]
    fn test_tax_id() {
        assert!(validate_tax_id("AAA010101AAA").is_ok());
        assert!(validate_tax_id("short").is_err());
        assert!(validate_tax_id("aaa010101aaa").is_err());
    }
}
