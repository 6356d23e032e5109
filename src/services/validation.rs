//! Field validators
//!
//! Each validator returns `Ok` or a human-readable message naming the field.
//! Callers stop at the first failure.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;

use crate::entities::loan_requests::LoanStatus;
use crate::services::amounts::MAX_AMOUNT;

lazy_static! {
    static ref ADDRESS_RE: Regex = Regex::new(r"^0x[0-9a-f]{40}$").unwrap();
    static ref DATE_RE: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
    static ref TX_HASH_RE: Regex = Regex::new(r"^0x[0-9a-f]{64}$").unwrap();
}

/// Expects an already-sanitized (lowercased) address
pub fn validate_address(field: &str, address: &str) -> Result<(), String> {
    if address.is_empty() {
        return Err(format!("{} is required", field));
    }
    if !ADDRESS_RE.is_match(address) {
        return Err(format!(
            "{} must be a 0x-prefixed 40 hex character address",
            field
        ));
    }
    Ok(())
}

pub fn validate_required(field: &str, value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("{} is required", field));
    }
    Ok(())
}

pub fn validate_positive_amount(field: &str, amount: Decimal) -> Result<(), String> {
    if amount <= Decimal::ZERO {
        return Err(format!("{} must be a positive number", field));
    }
    if amount > MAX_AMOUNT {
        return Err(format!("{} must not exceed {}", field, MAX_AMOUNT));
    }
    Ok(())
}

/// Rates are fractions in [0, 1] inclusive
pub fn validate_rate(field: &str, rate: Decimal) -> Result<(), String> {
    if rate < Decimal::ZERO || rate > Decimal::ONE {
        return Err(format!("{} must be between 0 and 1", field));
    }
    Ok(())
}

pub fn validate_positive_integer(field: &str, value: i64) -> Result<i32, String> {
    if value <= 0 || value > i32::MAX as i64 {
        return Err(format!("{} must be a positive integer", field));
    }
    Ok(value as i32)
}

/// `YYYY-MM-DD` that is also a real calendar date
pub fn validate_date(field: &str, value: &str) -> Result<NaiveDate, String> {
    if !DATE_RE.is_match(value) {
        return Err(format!("{} must be in YYYY-MM-DD format", field));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("{} is not a valid calendar date", field))
}

pub fn validate_tx_hash(field: &str, tx_hash: &str) -> Result<(), String> {
    if !TX_HASH_RE.is_match(tx_hash) {
        return Err(format!(
            "{} must be a 0x-prefixed 64 hex character transaction hash",
            field
        ));
    }
    Ok(())
}

pub fn validate_status(value: &str) -> Result<LoanStatus, String> {
    if value.is_empty() {
        return Err("status is required".to_string());
    }
    value.parse::<LoanStatus>()
}

/// Parse a path id; ids are positive integers
pub fn validate_id(field: &str, raw: &str) -> Result<i32, String> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| format!("{} must be a positive integer", field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_validate_address() {
        assert!(validate_address("borrower_address", "0x5fbdb2315678afecb367f032d93f642f64180aa3").is_ok());
        assert!(validate_address("borrower_address", "0x5FBDB2315678afecb367f032d93f642f64180aa3").is_err());
        assert!(validate_address("borrower_address", "0x5fbdb").is_err());
        let err = validate_address("lender_address", "").unwrap_err();
        assert!(err.contains("lender_address"));
    }

    #[test]
    fn test_validate_rate_bounds_inclusive() {
        assert!(validate_rate("advance_rate", dec!(0)).is_ok());
        assert!(validate_rate("advance_rate", dec!(1)).is_ok());
        assert!(validate_rate("advance_rate", dec!(0.8)).is_ok());
        assert!(validate_rate("advance_rate", dec!(1.01)).is_err());
        assert!(validate_rate("advance_rate", dec!(-0.1)).is_err());
    }

    #[test]
    fn test_validate_date() {
        assert_eq!(
            validate_date("invoice_due_date", "2025-06-30").unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
        );
        assert!(validate_date("invoice_due_date", "2025-02-30").is_err());
        assert!(validate_date("invoice_due_date", "30/06/2025").is_err());
        assert!(validate_date("invoice_due_date", "2025-6-30").is_err());
    }

    #[test]
    fn test_validate_positive_values() {
        assert!(validate_positive_amount("amount", dec!(0)).is_err());
        assert!(validate_positive_amount("amount", dec!(0.000001)).is_ok());
        assert!(validate_positive_amount("amount", MAX_AMOUNT).is_ok());
        let err = validate_positive_amount("amount", Decimal::MAX).unwrap_err();
        assert!(err.contains("must not exceed"));
        assert_eq!(validate_positive_integer("term", 30).unwrap(), 30);
        assert!(validate_positive_integer("term", 0).is_err());
    }

    #[test]
    fn test_validate_status() {
        assert_eq!(validate_status("paid").unwrap(), LoanStatus::Paid);
        assert!(validate_status("ARCHIVED").unwrap_err().contains("REQUESTED"));
        assert!(validate_status("").is_err());
    }

    #[test]
    fn test_validate_id() {
        assert_eq!(validate_id("id", "42").unwrap(), 42);
        assert!(validate_id("id", "0").is_err());
        assert!(validate_id("id", "abc").is_err());
    }
}
