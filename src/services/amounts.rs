//! Monetary helpers
//!
//! Amounts are `Decimal` in memory, canonical decimal strings in the
//! database and 6-decimal fixed point on-chain.

use alloy::primitives::U256;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use std::str::FromStr;

use crate::error::AppError;
use crate::services::chain_gateway::ChainError;

/// Protocol fee taken from every repayment
pub const PROTOCOL_FEE_RATE: Decimal = dec!(0.01);

/// Precision of the invoice token
pub const TOKEN_SCALE: u32 = 6;

/// Largest amount accepted on any request. Keeps sums, interest and
/// base-unit scaling far inside `Decimal` range.
pub const MAX_AMOUNT: Decimal = dec!(1000000000000000);

/// Interest accrues per 30-day month
const DAYS_PER_MONTH: Decimal = dec!(30);

/// Canonical storage form: no trailing zeros, no exponent
pub fn to_storage(amount: Decimal) -> String {
    amount.normalize().to_string()
}

/// Parse a stored amount; a malformed column is a storage fault
pub fn from_storage(column: &str, raw: &str) -> Result<Decimal, AppError> {
    Decimal::from_str(raw).map_err(|e| {
        AppError::Storage(sea_orm::DbErr::Type(format!(
            "Invalid decimal in {}: '{}' ({})",
            column, raw, e
        )))
    })
}

/// Whole-token amount to on-chain base units
pub fn to_base_units(amount: Decimal, decimals: u32) -> Result<U256, ChainError> {
    if amount.is_sign_negative() {
        return Err(ChainError::InvalidAmount(format!("{} is negative", amount)));
    }
    if amount.normalize().scale() > decimals {
        return Err(ChainError::InvalidAmount(format!(
            "{} has more than {} decimal places",
            amount, decimals
        )));
    }

    let multiplier = Decimal::from_i128_with_scale(10_i128.pow(decimals), 0);
    let units = amount
        .checked_mul(multiplier)
        .ok_or_else(|| ChainError::InvalidAmount(format!("{} overflows", amount)))?
        .trunc()
        .normalize();

    U256::from_str(&units.to_string())
        .map_err(|e| ChainError::InvalidAmount(format!("{}: {}", amount, e)))
}

/// On-chain base units to whole-token amount
pub fn from_base_units(units: U256, decimals: u32) -> Result<Decimal, ChainError> {
    let raw = Decimal::from_str(&units.to_string())
        .map_err(|e| ChainError::InvalidAmount(format!("{} base units: {}", units, e)))?;
    let divisor = Decimal::from_i128_with_scale(10_i128.pow(decimals), 0);
    Ok((raw / divisor).normalize())
}

/// Split of a gross repayment into protocol fee and vault credit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepaymentBreakdown {
    pub gross: Decimal,
    pub fee: Decimal,
    pub net: Decimal,
}

impl RepaymentBreakdown {
    pub fn from_gross(gross: Decimal) -> Self {
        let fee = (gross * PROTOCOL_FEE_RATE)
            .round_dp_with_strategy(TOKEN_SCALE, RoundingStrategy::MidpointAwayFromZero);
        Self {
            gross,
            fee,
            net: gross - fee,
        }
    }
}

/// Principal plus simple interest over the term; `None` on overflow
pub fn accrued_debt(max_loan: Decimal, monthly_interest_rate: Decimal, term_days: i32) -> Option<Decimal> {
    let months = Decimal::from(term_days).checked_div(DAYS_PER_MONTH)?;
    let factor = monthly_interest_rate.checked_mul(months)?.checked_add(Decimal::ONE)?;
    Some(
        max_loan
            .checked_mul(factor)?
            .round_dp_with_strategy(TOKEN_SCALE, RoundingStrategy::MidpointAwayFromZero),
    )
}

/// Never negative: overpayment leaves a zero balance
pub fn outstanding_balance(accrued: Decimal, total_repaid: Decimal) -> Decimal {
    (accrued - total_repaid).max(Decimal::ZERO)
}
