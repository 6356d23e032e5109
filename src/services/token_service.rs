//! Invoice token reads and the test-token faucet

use std::sync::Arc;
use tracing::info;

use crate::error::AppError;
use crate::models::token::{FaucetRequest, FaucetResult, TokenBalance};
use crate::services::chain_gateway::{bounded, ChainGateway};
use crate::services::vault_ledger::LedgerSettings;

#[derive(Clone)]
pub struct TokenService {
    gateway: Arc<dyn ChainGateway>,
    settings: LedgerSettings,
}

impl TokenService {
    pub fn new(gateway: Arc<dyn ChainGateway>, settings: LedgerSettings) -> Self {
        Self { gateway, settings }
    }

    pub async fn balance(&self, address: &str, spender: Option<&str>) -> Result<TokenBalance, AppError> {
        let limit = self.settings.chain_timeout;
        let balance = bounded(limit, "token_balance", self.gateway.token_balance(address)).await?;

        let allowance = match spender {
            Some(spender) => Some(
                bounded(limit, "token_allowance", self.gateway.token_allowance(address, spender)).await?,
            ),
            None => None,
        };

        Ok(TokenBalance {
            address: address.to_string(),
            balance,
            spender: spender.map(str::to_string),
            allowance,
        })
    }

    pub async fn faucet(&self, request: &FaucetRequest) -> Result<FaucetResult, AppError> {
        let tx_hash = bounded(
            self.settings.chain_timeout,
            "mint_test_tokens",
            self.gateway.mint_test_tokens(&request.address, request.amount),
        )
        .await?;

        info!(to = %request.address, amount = %request.amount, tx_hash = %tx_hash, "Faucet mint confirmed");

        Ok(FaucetResult {
            address: request.address.clone(),
            amount: request.amount,
            explorer_url: format!("{}/tx/{}", self.settings.explorer_base_url, tx_hash),
            tx_hash,
        })
    }
}
