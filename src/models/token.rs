//! Invoice token API models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::services::sanitize;
use crate::services::validation;

/// Upper bound on a single faucet mint, in whole tokens
pub const MAX_FAUCET_AMOUNT: Decimal = rust_decimal_macros::dec!(100000);

#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    /// Also report the allowance granted to this spender
    pub spender: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenBalance {
    pub address: String,
    pub balance: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowance: Option<Decimal>,
}

/// Body of POST /tokens/faucet
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FaucetBody {
    #[serde(default)]
    pub address: Value,
    #[serde(default)]
    pub amount: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FaucetRequest {
    pub address: String,
    pub amount: Decimal,
}

impl FaucetBody {
    pub fn into_request(self) -> Result<FaucetRequest, String> {
        let address = sanitize::address_value(&self.address);
        let amount = sanitize::decimal_value(&self.amount);

        validation::validate_address("address", &address)?;
        validation::validate_positive_amount("amount", amount)?;
        if amount > MAX_FAUCET_AMOUNT {
            return Err(format!("amount must not exceed {}", MAX_FAUCET_AMOUNT));
        }

        Ok(FaucetRequest { address, amount })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FaucetResult {
    pub address: String,
    pub amount: Decimal,
    pub tx_hash: String,
    pub explorer_url: String,
}
