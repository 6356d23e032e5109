#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use invoice_factoring_backend::{
    config::ChainConfig,
    models::loan_request::NewLoanRequest,
    services::chain_gateway::{ChainError, ChainGateway, DeployedVault, VaultDeploymentRequest},
    AppState,
};
use migration::{Migrator, MigratorTrait};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const BORROWER: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";
pub const LENDER_A: &str = "0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc";
pub const LENDER_B: &str = "0x90f79bf6eb2c4f870365e785982e1f101e93b906";

/// In-memory SQLite with every migration applied. A single connection keeps
/// the in-memory database alive for the whole test.
pub async fn setup_test_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(options).await.expect("sqlite connection");
    Migrator::up(&db, None).await.expect("migrations");
    db
}

pub fn test_chain_config() -> ChainConfig {
    ChainConfig {
        rpc_url: "http://localhost:8545".to_string(),
        private_key: "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80".to_string(),
        vault_factory_address: "0x5fbdb2315678afecb367f032d93f642f64180aa3".to_string(),
        token_address: "0xe7f1725e7734ce288f8367e1bb143e90bb3f0512".to_string(),
        explorer_base_url: "https://sepolia.basescan.org".to_string(),
        debug_tx_base_url: Some("https://dashboard.tenderly.co/tx/base-sepolia".to_string()),
        timeout: Duration::from_millis(200),
        token_decimals: 6,
    }
}

/// How the fake gateway answers `deploy_vault`
#[derive(Debug, Clone)]
pub enum DeployBehavior {
    Succeed,
    Fail(ChainError),
    /// Sleep past the configured timeout
    Hang,
}

/// Chain gateway double: hands out sequential vault addresses and records
/// every deployment request it sees
pub struct FakeChainGateway {
    behavior: Mutex<DeployBehavior>,
    counter: AtomicU64,
    pub requests: Mutex<Vec<VaultDeploymentRequest>>,
    pub balances: Mutex<Vec<(String, Decimal)>>,
}

impl FakeChainGateway {
    pub fn new() -> Self {
        Self {
            behavior: Mutex::new(DeployBehavior::Succeed),
            counter: AtomicU64::new(0),
            requests: Mutex::new(Vec::new()),
            balances: Mutex::new(Vec::new()),
        }
    }

    pub fn set_behavior(&self, behavior: DeployBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn deploy_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<VaultDeploymentRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

pub fn fake_vault_address(n: u64) -> String {
    format!("0x{:040x}", 0xa000 + n)
}

pub fn fake_tx_hash(n: u64) -> String {
    format!("0x{:064x}", 0xbeef00 + n)
}

#[async_trait]
impl ChainGateway for FakeChainGateway {
    async fn deploy_vault(&self, request: &VaultDeploymentRequest) -> Result<DeployedVault, ChainError> {
        self.requests.lock().unwrap().push(request.clone());
        let behavior = self.behavior.lock().unwrap().clone();

        match behavior {
            DeployBehavior::Succeed => {
                let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(DeployedVault {
                    vault_address: fake_vault_address(n),
                    tx_hash: fake_tx_hash(n),
                    block_number: 1_000 + n,
                })
            }
            DeployBehavior::Fail(err) => Err(err),
            DeployBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Err(ChainError::Provider("unreachable".to_string()))
            }
        }
    }

    async fn token_balance(&self, owner: &str) -> Result<Decimal, ChainError> {
        Ok(self
            .balances
            .lock()
            .unwrap()
            .iter()
            .find(|(address, _)| address == owner)
            .map(|(_, balance)| *balance)
            .unwrap_or(Decimal::ZERO))
    }

    async fn token_allowance(&self, _owner: &str, _spender: &str) -> Result<Decimal, ChainError> {
        Ok(dec!(0))
    }

    async fn mint_test_tokens(&self, to: &str, amount: Decimal) -> Result<String, ChainError> {
        self.balances.lock().unwrap().push((to.to_string(), amount));
        Ok(fake_tx_hash(999))
    }
}

pub struct TestApp {
    pub db: DatabaseConnection,
    pub gateway: Arc<FakeChainGateway>,
    pub state: AppState,
}

pub async fn setup_app() -> TestApp {
    let db = setup_test_db().await;
    let gateway = Arc::new(FakeChainGateway::new());
    let state = AppState::new(db.clone(), gateway.clone(), &test_chain_config());
    TestApp { db, gateway, state }
}

/// The loan from the factoring walkthrough: 10000 invoice at 80% advance
pub fn sample_loan() -> NewLoanRequest {
    NewLoanRequest {
        invoice_number: "INV-001".to_string(),
        invoice_amount: dec!(10000),
        invoice_due_date: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
        customer_name: "Acme".to_string(),
        term: 60,
        advance_rate: dec!(0.8),
        monthly_interest_rate: dec!(0.02),
        max_loan: dec!(8000),
        delivery_completed: true,
        not_pledged: true,
        assignment_signed: true,
        borrower_address: BORROWER.to_string(),
    }
}

pub fn deposit_tx(n: u64) -> String {
    format!("0x{:064x}", 0xd00 + n)
}
