//! Vault capital ledger
//!
//! Owns the vaults table and everything that moves money through it:
//! deployment (through the chain gateway), lender deposits and repayments.
//!
//! Deployment is bracketed by a write-ahead row in `vault_deployments` so a
//! vault that exists on-chain but never made it into `vaults` can be found
//! and recorded later by [`VaultLedgerService::reconcile_deployments`] or
//! [`VaultLedgerService::attach_vault`].

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::ChainConfig;
use crate::entities::{
    loan_requests::LoanStatus,
    prelude::*,
    vault_deployments::{self, DeploymentStatus},
    vault_lenders, vault_repayments,
    vaults::{self, VaultStatus},
};
use crate::error::AppError;
use crate::models::loan_request::VaultDetails;
use crate::models::vault::{
    AttachVault, CreateVaultParams, DeployResult, DepositResult, NewDeposit, NewRepayment,
    ReconcileReport, RepaymentResult, UnresolvedDeployment, VaultStatusUpdate,
};
use crate::services::amounts::{from_storage, to_storage, RepaymentBreakdown};
use crate::services::chain_gateway::{bounded, ChainGateway, VaultDeploymentRequest};

/// Settings the ledger needs from the chain configuration
#[derive(Debug, Clone)]
pub struct LedgerSettings {
    pub explorer_base_url: String,
    pub debug_tx_base_url: Option<String>,
    pub chain_timeout: Duration,
}

impl From<&ChainConfig> for LedgerSettings {
    fn from(config: &ChainConfig) -> Self {
        Self {
            explorer_base_url: config.explorer_base_url.clone(),
            debug_tx_base_url: config.debug_tx_base_url.clone(),
            chain_timeout: config.timeout,
        }
    }
}

#[derive(Clone)]
pub struct VaultLedgerService {
    db: DatabaseConnection,
    gateway: Arc<dyn ChainGateway>,
    settings: LedgerSettings,
}

impl VaultLedgerService {
    pub fn new(db: DatabaseConnection, gateway: Arc<dyn ChainGateway>, settings: LedgerSettings) -> Self {
        Self { db, gateway, settings }
    }

    /// Deploy a vault through the factory and record it.
    ///
    /// The deployment intent is written before the chain call. If the chain
    /// call fails without broadcasting, the intent is marked FAILED; if the
    /// outcome is unknown (timeout, lost receipt, failed send) it stays
    /// PENDING for reconciliation.
    pub async fn create_vault(&self, params: &CreateVaultParams) -> Result<DeployResult, AppError> {
        let intent = self.begin_deployment(params).await?;
        self.deploy_from_intent(intent, params).await
    }

    /// Check the linked loan request, if any, and write the PENDING intent.
    /// An error here means the factory was never called.
    pub async fn begin_deployment(&self, params: &CreateVaultParams) -> Result<vault_deployments::Model, AppError> {
        if let Some(loan_request_id) = params.loan_request_id {
            self.ensure_loan_can_take_vault(loan_request_id).await?;
        }

        let now = Utc::now().fixed_offset();
        let intent = vault_deployments::ActiveModel {
            loan_request_id: Set(params.loan_request_id),
            borrower_address: Set(params.borrower_address.clone()),
            name: Set(params.vault_name()),
            symbol: Set(params.vault_symbol()),
            max_capacity: Set(to_storage(params.invoice_amount)),
            maturity_date: Set(params.maturity_date),
            status: Set(DeploymentStatus::Pending),
            vault_address: Set(None),
            tx_hash: Set(None),
            block_number: Set(None),
            error_message: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!(
            deployment_id = intent.id,
            loan_request_id = ?params.loan_request_id,
            name = %intent.name,
            "Vault deployment intent recorded"
        );
        Ok(intent)
    }

    /// Call the factory for a PENDING intent and record the resulting vault
    pub async fn deploy_from_intent(
        &self,
        intent: vault_deployments::Model,
        params: &CreateVaultParams,
    ) -> Result<DeployResult, AppError> {
        let request = VaultDeploymentRequest {
            name: intent.name.clone(),
            symbol: intent.symbol.clone(),
            borrower_address: intent.borrower_address.clone(),
            max_capacity: params.invoice_amount,
            maturity_date: intent.maturity_date,
        };

        let deployed = match bounded(
            self.settings.chain_timeout,
            "deploy_vault",
            self.gateway.deploy_vault(&request),
        )
        .await
        {
            Ok(deployed) => deployed,
            Err(e) => {
                let status = if e.nothing_broadcast() {
                    DeploymentStatus::Failed
                } else {
                    DeploymentStatus::Pending
                };
                error!(
                    deployment_id = intent.id,
                    loan_request_id = ?params.loan_request_id,
                    intent_status = ?status,
                    error = %e,
                    "Vault deployment failed"
                );
                if let Err(mark_err) = self.mark_intent(&intent, status, Some(e.to_string())).await {
                    error!(deployment_id = intent.id, error = %mark_err, "Failed to update deployment intent");
                }
                return Err(e.into());
            }
        };

        let mut active: vault_deployments::ActiveModel = intent.clone().into();
        active.status = Set(DeploymentStatus::Deployed);
        active.vault_address = Set(Some(deployed.vault_address.clone()));
        active.tx_hash = Set(Some(deployed.tx_hash.clone()));
        active.block_number = Set(i64::try_from(deployed.block_number).ok());
        active.updated_at = Set(Utc::now().fixed_offset());
        let intent = active.update(&self.db).await?;

        let vault = self
            .record_from_intent(
                &intent,
                &deployed.vault_address,
                Some(deployed.tx_hash.clone()),
                i64::try_from(deployed.block_number).ok(),
            )
            .await
            .map_err(|e| {
                error!(
                    deployment_id = intent.id,
                    vault_address = %deployed.vault_address,
                    error = %e,
                    "Vault deployed on-chain but not recorded; reconcile to recover"
                );
                e
            })?;

        Ok(DeployResult {
            explorer_url: format!("{}/tx/{}", self.settings.explorer_base_url, deployed.tx_hash),
            address_url: format!("{}/address/{}", self.settings.explorer_base_url, deployed.vault_address),
            debug_url: self
                .settings
                .debug_tx_base_url
                .as_ref()
                .map(|base| format!("{}/{}", base, deployed.tx_hash)),
            vault_address: deployed.vault_address,
            tx_hash: deployed.tx_hash,
            block_number: deployed.block_number,
            vault,
        })
    }

    async fn ensure_loan_can_take_vault(&self, loan_request_id: i32) -> Result<(), AppError> {
        let loan = LoanRequests::find_by_id(loan_request_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan request {} not found", loan_request_id)))?;

        if loan.status != LoanStatus::Listed {
            return Err(AppError::Precondition(format!(
                "Loan request {} is {}; vaults are only linked to LISTED loan requests",
                loan_request_id, loan.status
            )));
        }

        if let Some(existing) = Vaults::find()
            .filter(vaults::Column::LoanRequestId.eq(loan_request_id))
            .one(&self.db)
            .await?
        {
            return Err(AppError::Precondition(format!(
                "Loan request {} already has vault {}",
                loan_request_id, existing.vault_address
            )));
        }

        let in_flight = VaultDeployments::find()
            .filter(vault_deployments::Column::LoanRequestId.eq(loan_request_id))
            .filter(
                vault_deployments::Column::Status
                    .is_in([DeploymentStatus::Pending, DeploymentStatus::Deployed]),
            )
            .one(&self.db)
            .await?;
        if let Some(intent) = in_flight {
            return Err(AppError::Precondition(format!(
                "Loan request {} has an unresolved vault deployment ({})",
                loan_request_id, intent.id
            )));
        }

        Ok(())
    }

    async fn mark_intent(
        &self,
        intent: &vault_deployments::Model,
        status: DeploymentStatus,
        error_message: Option<String>,
    ) -> Result<vault_deployments::Model, AppError> {
        let mut active: vault_deployments::ActiveModel = intent.clone().into();
        active.status = Set(status);
        active.error_message = Set(error_message);
        active.updated_at = Set(Utc::now().fixed_offset());
        Ok(active.update(&self.db).await?)
    }

    /// Insert the vault row for a deployment intent and mark it RECORDED in
    /// one transaction. Returns the existing row when the address is already
    /// recorded.
    async fn record_from_intent(
        &self,
        intent: &vault_deployments::Model,
        vault_address: &str,
        tx_hash: Option<String>,
        block_number: Option<i64>,
    ) -> Result<vaults::Model, AppError> {
        let txn = self.db.begin().await?;

        let vault = match Vaults::find()
            .filter(vaults::Column::VaultAddress.eq(vault_address))
            .one(&txn)
            .await?
        {
            Some(existing) => existing,
            None => {
                let now = Utc::now().fixed_offset();
                vaults::ActiveModel {
                    vault_address: Set(vault_address.to_string()),
                    borrower_address: Set(intent.borrower_address.clone()),
                    loan_request_id: Set(intent.loan_request_id),
                    name: Set(intent.name.clone()),
                    symbol: Set(intent.symbol.clone()),
                    max_capacity: Set(intent.max_capacity.clone()),
                    current_capacity: Set("0".to_string()),
                    maturity_date: Set(intent.maturity_date),
                    status: Set(VaultStatus::Pending),
                    deploy_tx_hash: Set(tx_hash.clone()),
                    block_number: Set(block_number),
                    funded_at: Set(None),
                    fund_release_tx_hash: Set(None),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(&txn)
                .await?
            }
        };

        let mut active: vault_deployments::ActiveModel = intent.clone().into();
        active.status = Set(DeploymentStatus::Recorded);
        active.vault_address = Set(Some(vault_address.to_string()));
        active.tx_hash = Set(tx_hash);
        active.block_number = Set(block_number);
        active.error_message = Set(None);
        active.updated_at = Set(Utc::now().fixed_offset());
        active.update(&txn).await?;

        txn.commit().await?;

        info!(
            deployment_id = intent.id,
            vault_id = vault.id,
            vault_address = %vault.vault_address,
            loan_request_id = ?vault.loan_request_id,
            "Vault recorded"
        );
        Ok(vault)
    }

    /// Record a lender deposit. The vault row is locked for the duration of
    /// the transaction; the lender row and the capacity increment commit
    /// together or not at all.
    pub async fn record_deposit(&self, vault_address: &str, deposit: &NewDeposit) -> Result<DepositResult, AppError> {
        let txn = self.db.begin().await?;

        let vault = find_vault_for_update(&txn, vault_address).await?;
        let lender = insert_lender(&txn, vault.id, deposit).await?;
        let vault = increment_capacity(&txn, &vault, deposit).await?;

        txn.commit().await?;

        info!(
            vault_id = vault.id,
            vault_address = %vault.vault_address,
            lender = %lender.lender_address,
            amount = %deposit.amount,
            current_capacity = %vault.current_capacity,
            "Deposit recorded"
        );

        Ok(DepositResult { vault, lender })
    }

    /// Record a repayment, splitting the gross amount into protocol fee and
    /// net credit
    pub async fn record_repayment(
        &self,
        vault_address: &str,
        repayment: &NewRepayment,
    ) -> Result<RepaymentResult, AppError> {
        let breakdown = RepaymentBreakdown::from_gross(repayment.gross_amount);
        let txn = self.db.begin().await?;

        let vault = find_vault_for_update(&txn, vault_address).await?;
        let now = Utc::now().fixed_offset();

        let repayment_row = vault_repayments::ActiveModel {
            vault_id: Set(vault.id),
            gross_amount: Set(to_storage(breakdown.gross)),
            fee_amount: Set(to_storage(breakdown.fee)),
            net_amount: Set(to_storage(breakdown.net)),
            tx_hash: Set(repayment.tx_hash.clone()),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut active: vaults::ActiveModel = vault.into();
        active.updated_at = Set(now);
        let vault = active.update(&txn).await?;

        txn.commit().await?;

        info!(
            vault_id = vault.id,
            gross = %breakdown.gross,
            fee = %breakdown.fee,
            net = %breakdown.net,
            "Repayment recorded"
        );

        Ok(RepaymentResult {
            vault,
            repayment: repayment_row,
        })
    }

    /// Newest first
    pub async fn get_all_vaults(&self) -> Result<Vec<vaults::Model>, AppError> {
        Ok(Vaults::find()
            .order_by_desc(vaults::Column::CreatedAt)
            .order_by_desc(vaults::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn get_vault(&self, vault_address: &str) -> Result<vaults::Model, AppError> {
        Vaults::find()
            .filter(vaults::Column::VaultAddress.eq(vault_address))
            .one(&self.db)
            .await?
            .ok_or_else(|| vault_not_found(vault_address))
    }

    /// Deposits into a vault, newest first
    pub async fn get_vault_lenders(&self, vault_address: &str) -> Result<Vec<vault_lenders::Model>, AppError> {
        let vault = self.get_vault(vault_address).await?;
        self.lenders_for_vault(vault.id).await
    }

    /// Repayments into a vault, newest first
    pub async fn get_vault_repayments(
        &self,
        vault_address: &str,
    ) -> Result<Vec<vault_repayments::Model>, AppError> {
        let vault = self.get_vault(vault_address).await?;
        self.repayments_for_vault(vault.id).await
    }

    async fn lenders_for_vault(&self, vault_id: i32) -> Result<Vec<vault_lenders::Model>, AppError> {
        Ok(VaultLenders::find()
            .filter(vault_lenders::Column::VaultId.eq(vault_id))
            .order_by_desc(vault_lenders::Column::CreatedAt)
            .order_by_desc(vault_lenders::Column::Id)
            .all(&self.db)
            .await?)
    }

    async fn repayments_for_vault(&self, vault_id: i32) -> Result<Vec<vault_repayments::Model>, AppError> {
        Ok(VaultRepayments::find()
            .filter(vault_repayments::Column::VaultId.eq(vault_id))
            .order_by_desc(vault_repayments::Column::CreatedAt)
            .order_by_desc(vault_repayments::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Vaults of a loan request with their deposits and repayments
    pub async fn vault_details_for_loan(&self, loan_request_id: i32) -> Result<Vec<VaultDetails>, AppError> {
        let vaults = Vaults::find()
            .filter(vaults::Column::LoanRequestId.eq(loan_request_id))
            .order_by_asc(vaults::Column::CreatedAt)
            .all(&self.db)
            .await?;

        let mut details = Vec::with_capacity(vaults.len());
        for vault in vaults {
            let lenders = self.lenders_for_vault(vault.id).await?;
            let repayments = self.repayments_for_vault(vault.id).await?;
            details.push(VaultDetails {
                vault,
                lenders,
                repayments,
            });
        }
        Ok(details)
    }

    /// Apply an externally observed status change. RELEASED also stamps
    /// `funded_at` and the release transaction.
    pub async fn update_vault_status(
        &self,
        vault_address: &str,
        update: &VaultStatusUpdate,
    ) -> Result<vaults::Model, AppError> {
        let vault = self.get_vault(vault_address).await?;
        let previous = vault.status;
        let now = Utc::now().fixed_offset();

        let mut active: vaults::ActiveModel = vault.into();
        active.status = Set(update.status);
        active.updated_at = Set(now);
        if update.status == VaultStatus::Released {
            active.funded_at = Set(Some(now));
            active.fund_release_tx_hash = Set(update.fund_release_tx_hash.clone());
        }
        let vault = active.update(&self.db).await?;

        info!(
            vault_id = vault.id,
            from = %previous,
            to = %vault.status,
            "Vault status updated"
        );
        Ok(vault)
    }

    /// Record a vault that was deployed but never written. Safe to repeat.
    pub async fn attach_vault(&self, attach: &AttachVault) -> Result<vaults::Model, AppError> {
        let intent = VaultDeployments::find_by_id(attach.deployment_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Vault deployment {} not found", attach.deployment_id)))?;

        if intent.status == DeploymentStatus::Recorded {
            return match intent.vault_address.as_deref() {
                Some(address) if address == attach.vault_address => self.get_vault(address).await,
                Some(address) => Err(AppError::Precondition(format!(
                    "Vault deployment {} already recorded vault {}",
                    intent.id, address
                ))),
                None => Err(AppError::Precondition(format!(
                    "Vault deployment {} is RECORDED without an address",
                    intent.id
                ))),
            };
        }

        let tx_hash = attach.tx_hash.clone().or_else(|| intent.tx_hash.clone());
        let block_number = attach.block_number.or(intent.block_number);

        info!(
            deployment_id = intent.id,
            vault_address = %attach.vault_address,
            previous_status = ?intent.status,
            "Attaching vault to deployment"
        );
        self.record_from_intent(&intent, &attach.vault_address, tx_hash, block_number)
            .await
    }

    /// Record every deployment whose address is known but whose vault row
    /// is missing, and report the ones whose outcome is still unknown
    pub async fn reconcile_deployments(&self) -> Result<ReconcileReport, AppError> {
        let open = VaultDeployments::find()
            .filter(
                vault_deployments::Column::Status
                    .is_in([DeploymentStatus::Pending, DeploymentStatus::Deployed]),
            )
            .order_by_asc(vault_deployments::Column::Id)
            .all(&self.db)
            .await?;

        let mut report = ReconcileReport::default();

        for intent in open {
            let address = match (&intent.status, intent.vault_address.clone()) {
                (DeploymentStatus::Deployed, Some(address)) => address,
                _ => {
                    report.unresolved.push(unresolved(&intent, intent.error_message.clone()));
                    continue;
                }
            };

            match self
                .record_from_intent(&intent, &address, intent.tx_hash.clone(), intent.block_number)
                .await
            {
                Ok(vault) => report.recorded.push(vault.vault_address),
                Err(e) => {
                    warn!(deployment_id = intent.id, error = %e, "Reconciliation failed for deployment");
                    report.unresolved.push(unresolved(&intent, Some(e.to_string())));
                }
            }
        }

        info!(
            recorded = report.recorded.len(),
            unresolved = report.unresolved.len(),
            "Deployment reconciliation finished"
        );
        Ok(report)
    }
}

fn unresolved(intent: &vault_deployments::Model, error_message: Option<String>) -> UnresolvedDeployment {
    UnresolvedDeployment {
        deployment_id: intent.id,
        status: intent.status,
        loan_request_id: intent.loan_request_id,
        error_message,
    }
}

fn vault_not_found(vault_address: &str) -> AppError {
    AppError::NotFound(format!("Vault {} not found", vault_address))
}

/// Read a vault with an exclusive row lock (SELECT ... FOR UPDATE)
async fn find_vault_for_update<C: ConnectionTrait>(conn: &C, vault_address: &str) -> Result<vaults::Model, AppError> {
    Vaults::find()
        .filter(vaults::Column::VaultAddress.eq(vault_address))
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or_else(|| vault_not_found(vault_address))
}

async fn insert_lender<C: ConnectionTrait>(
    conn: &C,
    vault_id: i32,
    deposit: &NewDeposit,
) -> Result<vault_lenders::Model, AppError> {
    Ok(vault_lenders::ActiveModel {
        vault_id: Set(vault_id),
        lender_address: Set(deposit.lender_address.clone()),
        amount: Set(to_storage(deposit.amount)),
        tx_hash: Set(deposit.tx_hash.clone()),
        created_at: Set(Utc::now().fixed_offset()),
        ..Default::default()
    }
    .insert(conn)
    .await?)
}

/// Add the deposit to `current_capacity`. The write is conditional on the
/// value read under the lock, so a concurrent writer can never be silently
/// overwritten.
async fn increment_capacity<C: ConnectionTrait>(
    conn: &C,
    vault: &vaults::Model,
    deposit: &NewDeposit,
) -> Result<vaults::Model, AppError> {
    let current = from_storage("vaults.current_capacity", &vault.current_capacity)?;
    let max = from_storage("vaults.max_capacity", &vault.max_capacity)?;
    let updated = current.checked_add(deposit.amount).ok_or_else(|| {
        AppError::Validation(format!(
            "Deposit of {} takes vault {} capacity out of range",
            deposit.amount, vault.vault_address
        ))
    })?;

    if updated > max {
        warn!(
            vault_id = vault.id,
            current_capacity = %updated,
            max_capacity = %max,
            "Deposit takes vault over its max capacity"
        );
    }

    let now = Utc::now().fixed_offset();
    let result = Vaults::update_many()
        .set(vaults::ActiveModel {
            current_capacity: Set(to_storage(updated)),
            updated_at: Set(now),
            ..Default::default()
        })
        .filter(vaults::Column::Id.eq(vault.id))
        .filter(vaults::Column::CurrentCapacity.eq(vault.current_capacity.clone()))
        .exec(conn)
        .await?;

    if result.rows_affected != 1 {
        return Err(AppError::Conflict(format!(
            "Vault {} capacity changed during deposit; resubmit",
            vault.vault_address
        )));
    }

    Ok(vaults::Model {
        current_capacity: to_storage(updated),
        updated_at: now,
        ..vault.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::{Migrator, MigratorTrait};
    use rust_decimal_macros::dec;
    use sea_orm::{ConnectOptions, Database, PaginatorTrait};

    const VAULT: &str = "0x9fe46736679d2d9a65f0992f2272de9f3c7fa6e0";
    const LENDER: &str = "0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc";
    const TX: &str = "0x1111111111111111111111111111111111111111111111111111111111111111";

    async fn setup() -> (DatabaseConnection, vaults::Model) {
        let mut options = ConnectOptions::new("sqlite::memory:");
        options.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Database::connect(options).await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let now = Utc::now().fixed_offset();
        let vault = vaults::ActiveModel {
            vault_address: Set(VAULT.to_string()),
            borrower_address: Set("0x70997970c51812dc3a010c7d01b50e0d17dc79c8".to_string()),
            loan_request_id: Set(None),
            name: Set("Acme_INV-1_Vault".to_string()),
            symbol: Set("Acme_INV-1".to_string()),
            max_capacity: Set("1000".to_string()),
            current_capacity: Set("0".to_string()),
            maturity_date: Set(1_767_139_200),
            status: Set(VaultStatus::Pending),
            deploy_tx_hash: Set(None),
            block_number: Set(None),
            funded_at: Set(None),
            fund_release_tx_hash: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        (db, vault)
    }

    fn deposit(amount: rust_decimal::Decimal) -> NewDeposit {
        NewDeposit {
            lender_address: LENDER.to_string(),
            amount,
            tx_hash: TX.to_string(),
        }
    }

    #[tokio::test]
    async fn test_failure_between_steps_leaves_nothing_behind() {
        let (db, vault) = setup().await;

        {
            let txn = db.begin().await.unwrap();
            let locked = find_vault_for_update(&txn, VAULT).await.unwrap();
            insert_lender(&txn, locked.id, &deposit(dec!(100))).await.unwrap();
            // Failure before the capacity increment: transaction dropped
            // without commit
        }

        let lenders = VaultLenders::find().count(&db).await.unwrap();
        assert_eq!(lenders, 0);
        let reloaded = Vaults::find_by_id(vault.id).one(&db).await.unwrap().unwrap();
        assert_eq!(reloaded.current_capacity, "0");
    }

    #[tokio::test]
    async fn test_stale_capacity_is_rejected() {
        let (db, vault) = setup().await;

        let stale = vaults::Model {
            current_capacity: "50".to_string(),
            ..vault.clone()
        };
        let err = increment_capacity(&db, &stale, &deposit(dec!(10))).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let reloaded = Vaults::find_by_id(vault.id).one(&db).await.unwrap().unwrap();
        assert_eq!(reloaded.current_capacity, "0");
    }

    #[tokio::test]
    async fn test_capacity_overflow_is_rejected() {
        let (db, vault) = setup().await;

        let full = vaults::Model {
            current_capacity: to_storage(rust_decimal::Decimal::MAX),
            ..vault.clone()
        };
        let err = increment_capacity(&db, &full, &deposit(dec!(1))).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let reloaded = Vaults::find_by_id(vault.id).one(&db).await.unwrap().unwrap();
        assert_eq!(reloaded.current_capacity, "0");
    }

    #[tokio::test]
    async fn test_increment_returns_updated_row() {
        let (db, vault) = setup().await;

        let updated = increment_capacity(&db, &vault, &deposit(dec!(12.5))).await.unwrap();
        assert_eq!(updated.current_capacity, "12.5");

        let reloaded = Vaults::find_by_id(vault.id).one(&db).await.unwrap().unwrap();
        assert_eq!(reloaded.current_capacity, "12.5");
    }
}
