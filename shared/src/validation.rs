//! Field validation for the point-of-sale API

use rust_decimal::Decimal;

use crate::money::Money;

// ============================================================================
// Identity and contact
// ============================================================================

/// Validate a customer document number (3-20 digits, letters or dashes)
pub fn validate_document(document: &str) -> Result<(), &'static str> {
    let document = document.trim();
    if document.len() < 3 {
        return Err("Document must be at least 3 characters");
    }
    if document.len() > 20 {
        return Err("Document must be at most 20 characters");
    }
    if !document.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err("Document may contain only letters, digits and dashes");
    }
    Ok(())
}

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

/// Validate a phone number: 7-15 digits, optional leading `+`, spaces ignored
pub fn validate_phone(phone: &str) -> Result<(), &'static str> {
    let cleaned: String = phone.chars().filter(|c| !c.is_whitespace() && *c != '-').collect();
    let digits = cleaned.strip_prefix('+').unwrap_or(&cleaned);

    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err("Phone number may contain only digits");
    }
    if digits.len() < 7 || digits.len() > 15 {
        return Err("Phone number must have between 7 and 15 digits");
    }
    Ok(())
}

// ============================================================================
// Amounts and periods
// ============================================================================

pub fn validate_positive_amount(amount: Money) -> Result<(), &'static str> {
    if !amount.is_positive() {
        return Err("Amount must be greater than zero");
    }
    Ok(())
}

pub fn validate_non_negative_amount(amount: Money) -> Result<(), &'static str> {
    if amount.is_negative() {
        return Err("Amount cannot be negative");
    }
    Ok(())
}

/// Cost weight used in fixed-cost apportionment (0 to 100)
pub fn validate_cost_weight(weight: Decimal) -> Result<(), &'static str> {
    if weight < Decimal::ZERO || weight > Decimal::ONE_HUNDRED {
        return Err("Cost weight must be between 0 and 100");
    }
    Ok(())
}

/// Validate a `YYYY-MM` month key
pub fn validate_month(month: &str) -> Result<(), &'static str> {
    let bytes = month.as_bytes();
    if !month.is_ascii() || bytes.len() != 7 || bytes[4] != b'-' {
        return Err("Month must have the form YYYY-MM");
    }
    if !month[..4].chars().all(|c| c.is_ascii_digit()) || !month[5..].chars().all(|c| c.is_ascii_digit()) {
        return Err("Month must have the form YYYY-MM");
    }
    match month[5..].parse::<u32>() {
        Ok(m) if (1..=12).contains(&m) => Ok(()),
        _ => Err("Month number must be between 01 and 12"),
    }
}

/// Day of the month a fixed cost falls due
pub fn validate_due_day(day: i32) -> Result<(), &'static str> {
    if !(1..=31).contains(&day) {
        return Err("Due day must be between 1 and 31");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_document() {
        assert!(validate_document("1020304050").is_ok());
        assert!(validate_document("CE-4455").is_ok());
        assert!(validate_document("12").is_err());
        assert!(validate_document("10 20 30").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("caja@tienda.co").is_ok());
        assert!(validate_email("invalid").is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("+57 300 123 4567").is_ok());
        assert!(validate_phone("300-123-4567").is_ok());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("30012345ab").is_err());
    }

    #[test]
    fn test_validate_amounts() {
        assert!(validate_positive_amount(Money::from_minor(1)).is_ok());
        assert!(validate_positive_amount(Money::ZERO).is_err());
        assert!(validate_non_negative_amount(Money::ZERO).is_ok());
        assert!(validate_non_negative_amount(Money::from_minor(-1)).is_err());
    }

    #[test]
    fn test_validate_cost_weight() {
        assert!(validate_cost_weight(Decimal::ONE).is_ok());
        assert!(validate_cost_weight(Decimal::from(-1)).is_err());
        assert!(validate_cost_weight(Decimal::from(101)).is_err());
    }

    #[test]
    fn test_validate_month() {
        assert!(validate_month("2024-03").is_ok());
        assert!(validate_month("2024-13").is_err());
        assert!(validate_month("2024-3").is_err());
        assert!(validate_month("24-03-01").is_err());
    }

    #[test]
    fn test_validate_due_day() {
        assert!(validate_due_day(15).is_ok());
        assert!(validate_due_day(0).is_err());
    }
}
