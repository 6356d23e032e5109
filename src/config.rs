//! Process configuration
//!
//! Read once from the environment at start-up and handed to the services that
//! need it. Nothing below `main` reads environment variables.

use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default bound on a single chain call (deploy + confirmation)
const DEFAULT_CHAIN_TIMEOUT_SECS: u64 = 120;

/// The invoice token is a 6-decimal stablecoin
const DEFAULT_TOKEN_DECIMALS: u32 = 6;

/// ERC-20 ceiling; base-unit scaling must stay inside `Decimal` range
const MAX_TOKEN_DECIMALS: u32 = 18;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

/// Chain gateway settings
#[derive(Clone)]
pub struct ChainConfig {
    /// JSON-RPC endpoint
    pub rpc_url: String,
    /// Deployer key (hex with 0x prefix); funds gas for factory calls
    pub private_key: String,
    /// Vault factory contract address
    pub vault_factory_address: String,
    /// ERC20-like invoice token address
    pub token_address: String,
    /// Block explorer base URL, e.g. https://sepolia.basescan.org
    pub explorer_base_url: String,
    /// Optional transaction debugger base URL
    pub debug_tx_base_url: Option<String>,
    pub timeout: Duration,
    pub token_decimals: u32,
}

impl std::fmt::Debug for ChainConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainConfig")
            .field("rpc_url", &self.rpc_url)
            .field("private_key", &"<redacted>")
            .field("vault_factory_address", &self.vault_factory_address)
            .field("token_address", &self.token_address)
            .field("explorer_base_url", &self.explorer_base_url)
            .field("debug_tx_base_url", &self.debug_tx_base_url)
            .field("timeout", &self.timeout)
            .field("token_decimals", &self.token_decimals)
            .finish()
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    /// Apply pending migrations on start-up
    pub run_migrations: bool,
    pub chain: ChainConfig,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary lookup (used by tests)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| -> Result<String, ConfigError> {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
        };
        let optional = |name: &str| -> Option<String> {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let timeout_secs = match optional("CHAIN_TIMEOUT_SECS") {
            Some(raw) => parse_number::<u64>("CHAIN_TIMEOUT_SECS", &raw)?,
            None => DEFAULT_CHAIN_TIMEOUT_SECS,
        };
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                name: "CHAIN_TIMEOUT_SECS".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        let token_decimals = match optional("TOKEN_DECIMALS") {
            Some(raw) => parse_number::<u32>("TOKEN_DECIMALS", &raw)?,
            None => DEFAULT_TOKEN_DECIMALS,
        };
        if token_decimals > MAX_TOKEN_DECIMALS {
            return Err(ConfigError::InvalidValue {
                name: "TOKEN_DECIMALS".to_string(),
                reason: format!("must be at most {}", MAX_TOKEN_DECIMALS),
            });
        }

        let run_migrations = match optional("RUN_MIGRATIONS") {
            Some(raw) => parse_flag("RUN_MIGRATIONS", &raw)?,
            None => true,
        };

        let chain = ChainConfig {
            rpc_url: required("CHAIN_RPC_URL")?,
            private_key: required("DEPLOYER_PRIVATE_KEY")?,
            vault_factory_address: required("VAULT_FACTORY_ADDRESS")?,
            token_address: required("TOKEN_ADDRESS")?,
            explorer_base_url: optional("EXPLORER_BASE_URL")
                .unwrap_or_else(|| "https://sepolia.basescan.org".to_string())
                .trim_end_matches('/')
                .to_string(),
            debug_tx_base_url: optional("DEBUG_TX_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string()),
            timeout: Duration::from_secs(timeout_secs),
            token_decimals,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            bind_address: optional("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            run_migrations,
            chain,
        })
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, ConfigError> {
    raw.parse::<T>().map_err(|_| ConfigError::InvalidValue {
        name: name.to_string(),
        reason: format!("'{}' is not a valid number", raw),
    })
}

fn parse_flag(name: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            reason: format!("'{}' is not a boolean", raw),
        }),
    }
}
