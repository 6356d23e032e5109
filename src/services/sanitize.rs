//! Input sanitization
//!
//! Sanitizers normalize untrusted request values and never reject: a value
//! that cannot be coerced becomes the type's neutral value (empty string,
//! zero, false) and is caught later by validation. Every sanitizer is
//! idempotent.

use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// Per-field maximum lengths, in characters
pub mod limits {
    pub const INVOICE_NUMBER: usize = 100;
    pub const CUSTOMER_NAME: usize = 255;
    pub const LEGAL_NAME: usize = 255;
    pub const COUNTRY: usize = 100;
    pub const REGISTRATION_NUMBER: usize = 100;
    pub const DESCRIPTION: usize = 2000;
    pub const UBO_NAME: usize = 255;
    pub const STATUS: usize = 20;
    /// Generic cap for short identifiers (dates, numbers as text)
    pub const SHORT: usize = 64;
}

/// Trim and lowercase a wallet/contract address
pub fn sanitize_address(input: &str) -> String {
    input.trim().to_lowercase()
}

/// Strip control characters (tab and newline survive until whitespace
/// folding), collapse whitespace runs, trim, and cap at `max_chars`.
pub fn sanitize_text(input: &str, max_chars: usize) -> String {
    let cleaned: String = input
        .chars()
        .filter(|c| !matches!(c, '\u{0000}'..='\u{0008}' | '\u{000B}'..='\u{001F}' | '\u{007F}'))
        .collect();

    let collapsed = cleaned.split_whitespace().collect::<Vec<&str>>().join(" ");

    collapsed
        .chars()
        .take(max_chars)
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Text from a JSON value; numbers and booleans are rendered, anything else
/// is empty.
pub fn text_value(value: &Value, max_chars: usize) -> String {
    match value {
        Value::String(s) => sanitize_text(s, max_chars),
        Value::Number(n) => sanitize_text(&n.to_string(), max_chars),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// Address from a JSON value (non-strings become empty)
pub fn address_value(value: &Value) -> String {
    match value {
        Value::String(s) => sanitize_address(s),
        _ => String::new(),
    }
}

/// Coerce to a decimal; non-numeric input becomes zero
pub fn decimal_value(value: &Value) -> Decimal {
    match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s),
        _ => Decimal::ZERO,
    }
}

fn parse_decimal(raw: &str) -> Decimal {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map(|d| d.normalize())
        .unwrap_or(Decimal::ZERO)
}

/// Coerce to an integer; fractional or non-numeric input becomes zero
pub fn integer_value(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n.as_i64().unwrap_or(0),
        Value::String(s) => s.trim().parse::<i64>().unwrap_or(0),
        _ => 0,
    }
}

/// `true`, "true", "1", "yes" (any case) and numeric 1 are true
pub fn bool_value(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() == Some(1.0),
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes"),
        _ => false,
    }
}

/// Date text, trimmed; parsing happens in validation
pub fn date_value(value: &Value) -> String {
    text_value(value, limits::SHORT)
}
