//! Chain gateway for vault factory and invoice token interactions
//!
//! The ledger depends only on the [`ChainGateway`] trait. [`AlloyChainGateway`]
//! is the production implementation: it deploys vaults through
//! `VaultFactory.deployVault()` and reads the deployed address from the
//! `VaultCreated` event in the receipt.

use alloy::{
    network::EthereumWallet,
    primitives::{Address, U256},
    providers::{Provider, ProviderBuilder, RootProvider},
    signers::local::PrivateKeySigner,
    sol,
    sol_types::SolEvent,
    transports::http::{Client, Http},
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::ChainConfig;
use crate::services::amounts::{from_base_units, to_base_units};

/// Fallback gas limit for deployVault when estimation fails
const DEFAULT_DEPLOY_GAS_LIMIT: u64 = 3_000_000;

sol! {
    #[sol(rpc)]
    interface IVaultFactory {
        function deployVault(
            string calldata name,
            string calldata symbol,
            address borrower,
            uint256 maxCapacity,
            uint256 maturityDate
        ) external returns (address vault);

        event VaultCreated(
            address indexed vault,
            address indexed borrower,
            string name,
            uint256 maxCapacity,
            uint256 maturityDate
        );
    }

    #[sol(rpc)]
    interface IInvoiceToken {
        function balanceOf(address account) external view returns (uint256 balance);
        function allowance(address owner, address spender) external view returns (uint256 remaining);
        function approve(address spender, uint256 amount) external returns (bool success);
        function mint(address to, uint256 amount) external;
    }
}

/// Error types for chain gateway calls
#[derive(Error, Debug, Clone)]
pub enum ChainError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Provider error: {0}")]
    Provider(String),
    #[error("Transaction error: {0}")]
    Transaction(String),
    #[error("Transaction reverted: {0}")]
    Reverted(String),
    #[error("Event parsing error: {0}")]
    EventParsing(String),
    #[error("Timeout: {0}")]
    Timeout(String),
}

impl ChainError {
    /// True when the failure happened before anything could land on-chain,
    /// so the caller may undo its own bookkeeping.
    ///
    /// A failed send is not included: the node may have accepted the raw
    /// transaction before the response was lost.
    pub fn nothing_broadcast(&self) -> bool {
        matches!(
            self,
            ChainError::InvalidAddress(_)
                | ChainError::InvalidConfig(_)
                | ChainError::InvalidAmount(_)
                | ChainError::Reverted(_)
        )
    }

    /// Timeouts are the only failures a caller should resubmit as-is
    pub fn is_retryable(&self) -> bool {
        matches!(self, ChainError::Timeout(_))
    }
}

/// Parameters for a vault factory deployment
#[derive(Debug, Clone)]
pub struct VaultDeploymentRequest {
    pub name: String,
    pub symbol: String,
    pub borrower_address: String,
    pub max_capacity: Decimal,
    /// Unix seconds
    pub maturity_date: i64,
}

/// Outcome of a confirmed vault deployment
#[derive(Debug, Clone)]
pub struct DeployedVault {
    /// Lowercase 0x address
    pub vault_address: String,
    pub tx_hash: String,
    pub block_number: u64,
}

#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// Deploy a vault and wait for its creation event
    async fn deploy_vault(&self, request: &VaultDeploymentRequest) -> Result<DeployedVault, ChainError>;

    /// Invoice token balance in whole-token units
    async fn token_balance(&self, owner: &str) -> Result<Decimal, ChainError>;

    /// Invoice token allowance in whole-token units
    async fn token_allowance(&self, owner: &str, spender: &str) -> Result<Decimal, ChainError>;

    /// Mint test tokens (faucet); returns the transaction hash
    async fn mint_test_tokens(&self, to: &str, amount: Decimal) -> Result<String, ChainError>;
}

/// Run a gateway call under a deadline
pub async fn bounded<T, F>(limit: Duration, operation: &str, call: F) -> Result<T, ChainError>
where
    F: Future<Output = Result<T, ChainError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            warn!(operation = %operation, timeout_secs = limit.as_secs_f64(), "Chain call timed out");
            Err(ChainError::Timeout(format!(
                "{} did not complete within {}s",
                operation,
                limit.as_secs()
            )))
        }
    }
}

/// Parse a 0x address, mapping failures to `InvalidAddress`
pub fn parse_address(field: &str, value: &str) -> Result<Address, ChainError> {
    Address::from_str(value.trim())
        .map_err(|e| ChainError::InvalidAddress(format!("{}: {}", field, e)))
}

/// Production gateway over alloy
pub struct AlloyChainGateway {
    provider: RootProvider<Http<Client>>,
    wallet: EthereumWallet,
    signer_address: Address,
    rpc_url: String,
    factory_address: Address,
    token_address: Address,
    token_decimals: u32,
}

impl AlloyChainGateway {
    /// Connect to the RPC endpoint and verify it answers
    pub async fn new(config: &ChainConfig) -> Result<Self, ChainError> {
        info!(
            rpc_url = %config.rpc_url,
            factory = %config.vault_factory_address,
            token = %config.token_address,
            "Initializing chain gateway"
        );

        let signer: PrivateKeySigner = config
            .private_key
            .parse()
            .map_err(|e| ChainError::InvalidConfig(format!("Invalid private key: {}", e)))?;
        let signer_address = signer.address();
        let wallet = EthereumWallet::from(signer);

        let provider = ProviderBuilder::new().on_http(
            config
                .rpc_url
                .parse()
                .map_err(|e| ChainError::InvalidConfig(format!("Invalid RPC URL: {}", e)))?,
        );

        let chain_id = provider.get_chain_id().await.map_err(|e| {
            error!(error = %e, "Failed to connect to chain RPC");
            ChainError::Provider(format!("Connection failed: {}", e))
        })?;

        let factory_address = Address::from_str(&config.vault_factory_address)
            .map_err(|e| ChainError::InvalidConfig(format!("Invalid vault factory address: {}", e)))?;
        let token_address = Address::from_str(&config.token_address)
            .map_err(|e| ChainError::InvalidConfig(format!("Invalid token address: {}", e)))?;

        info!(
            chain_id = chain_id,
            signer = %signer_address,
            "Chain gateway initialized"
        );

        Ok(Self {
            provider,
            wallet,
            signer_address,
            rpc_url: config.rpc_url.clone(),
            factory_address,
            token_address,
            token_decimals: config.token_decimals,
        })
    }

    /// Estimate gas for deployVault with a 20% buffer, falling back to a fixed limit
    async fn estimate_deploy_gas(
        &self,
        request: &VaultDeploymentRequest,
        borrower: Address,
        max_capacity: U256,
    ) -> u64 {
        let factory = IVaultFactory::new(self.factory_address, &self.provider);

        match factory
            .deployVault(
                request.name.clone(),
                request.symbol.clone(),
                borrower,
                max_capacity,
                U256::from(request.maturity_date.max(0) as u64),
            )
            .from(self.signer_address)
            .estimate_gas()
            .await
        {
            Ok(gas) => {
                let gas_with_buffer = gas * 120 / 100;
                debug!(estimated = gas, with_buffer = gas_with_buffer, "Gas estimation successful");
                gas_with_buffer
            }
            Err(e) => {
                warn!(error = %e, fallback = DEFAULT_DEPLOY_GAS_LIMIT, "Gas estimation failed, using fallback");
                DEFAULT_DEPLOY_GAS_LIMIT
            }
        }
    }
}

#[async_trait]
impl ChainGateway for AlloyChainGateway {
    async fn deploy_vault(&self, request: &VaultDeploymentRequest) -> Result<DeployedVault, ChainError> {
        info!(
            name = %request.name,
            symbol = %request.symbol,
            borrower = %request.borrower_address,
            max_capacity = %request.max_capacity,
            maturity_date = request.maturity_date,
            "Deploying vault"
        );

        let borrower = parse_address("borrower_address", &request.borrower_address)?;
        let max_capacity = to_base_units(request.max_capacity, self.token_decimals)?;
        let gas_limit = self.estimate_deploy_gas(request, borrower, max_capacity).await;

        let signing_provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(self.wallet.clone())
            .on_http(
                self.rpc_url
                    .parse()
                    .map_err(|e| ChainError::InvalidConfig(format!("RPC URL error: {}", e)))?,
            );
        let factory = IVaultFactory::new(self.factory_address, &signing_provider);

        let pending_tx = factory
            .deployVault(
                request.name.clone(),
                request.symbol.clone(),
                borrower,
                max_capacity,
                U256::from(request.maturity_date.max(0) as u64),
            )
            .gas(gas_limit)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send deployVault transaction");
                ChainError::Transaction(format!("Send failed: {}", e))
            })?;

        let tx_hash = format!("{:?}", pending_tx.tx_hash());
        info!(tx_hash = %tx_hash, "Deployment sent, waiting for confirmation");

        let receipt = pending_tx.get_receipt().await.map_err(|e| {
            error!(tx_hash = %tx_hash, error = %e, "Failed to get deployment receipt");
            ChainError::Provider(format!("Receipt failed: {}", e))
        })?;

        if !receipt.status() {
            return Err(ChainError::Reverted(format!("deployVault reverted in {}", tx_hash)));
        }

        let vault_address = parse_vault_created(receipt.inner.logs())?;
        let block_number = receipt.block_number.unwrap_or(0);

        info!(
            tx_hash = %tx_hash,
            vault_address = %vault_address,
            block_number = block_number,
            "Vault deployed"
        );

        Ok(DeployedVault {
            vault_address,
            tx_hash,
            block_number,
        })
    }

    async fn token_balance(&self, owner: &str) -> Result<Decimal, ChainError> {
        let owner = parse_address("address", owner)?;
        let token = IInvoiceToken::new(self.token_address, &self.provider);

        let result = token
            .balanceOf(owner)
            .call()
            .await
            .map_err(|e| ChainError::Provider(format!("balanceOf failed: {}", e)))?;

        from_base_units(result.balance, self.token_decimals)
    }

    async fn token_allowance(&self, owner: &str, spender: &str) -> Result<Decimal, ChainError> {
        let owner = parse_address("owner", owner)?;
        let spender = parse_address("spender", spender)?;
        let token = IInvoiceToken::new(self.token_address, &self.provider);

        let result = token
            .allowance(owner, spender)
            .call()
            .await
            .map_err(|e| ChainError::Provider(format!("allowance failed: {}", e)))?;

        from_base_units(result.remaining, self.token_decimals)
    }

    async fn mint_test_tokens(&self, to: &str, amount: Decimal) -> Result<String, ChainError> {
        let recipient = parse_address("address", to)?;
        let units = to_base_units(amount, self.token_decimals)?;

        let signing_provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(self.wallet.clone())
            .on_http(
                self.rpc_url
                    .parse()
                    .map_err(|e| ChainError::InvalidConfig(format!("RPC URL error: {}", e)))?,
            );
        let token = IInvoiceToken::new(self.token_address, &signing_provider);

        let pending_tx = token.mint(recipient, units).send().await.map_err(|e| {
            error!(error = %e, "Failed to send mint transaction");
            ChainError::Transaction(format!("Send failed: {}", e))
        })?;

        let tx_hash = format!("{:?}", pending_tx.tx_hash());
        let receipt = pending_tx
            .get_receipt()
            .await
            .map_err(|e| ChainError::Provider(format!("Receipt failed: {}", e)))?;

        if !receipt.status() {
            return Err(ChainError::Reverted(format!("mint reverted in {}", tx_hash)));
        }

        info!(tx_hash = %tx_hash, to = %to, amount = %amount, "Test tokens minted");
        Ok(tx_hash)
    }
}

/// Extract the vault address from the VaultCreated event in a receipt
fn parse_vault_created(logs: &[alloy::rpc::types::Log]) -> Result<String, ChainError> {
    let event_signature = IVaultFactory::VaultCreated::SIGNATURE_HASH;

    for log in logs {
        let topics = log.topics();
        if topics.len() < 3 || topics[0] != event_signature {
            continue;
        }
        // vault is the first indexed parameter (topics[1])
        return Ok(format!("0x{}", hex::encode(&topics[1].0[12..])));
    }

    Err(ChainError::EventParsing(
        "VaultCreated event not found in transaction receipt".to_string(),
    ))
}
