//! Loan request lifecycle
//!
//! Status changes go through [`is_allowed_transition`]. LISTED is only
//! reachable through [`LoanLifecycleService::approve`], which also deploys
//! the request's vault.

use chrono::NaiveTime;
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use crate::entities::loan_requests::{self, LoanStatus};
use crate::error::AppError;
use crate::models::loan_request::{
    BorrowerLoans, LoanRequestDetails, LoanRequestWithVault, LoanStats, NewLoanRequest,
};
use crate::models::vault::{CreateVaultParams, DeployResult};
use crate::services::amounts::{accrued_debt, from_storage, outstanding_balance};
use crate::services::loan_request_store::LoanRequestStore;
use crate::services::vault_ledger::VaultLedgerService;

/// Transitions accepted by [`LoanLifecycleService::change_status`].
/// REQUESTED -> LISTED is deliberately absent: it belongs to `approve`.
pub fn is_allowed_transition(from: LoanStatus, to: LoanStatus) -> bool {
    use LoanStatus::*;

    matches!(
        (from, to),
        (Requested, Rejected)
            | (Requested, Canceled)
            | (Listed, Active)
            | (Listed, Canceled)
            | (Active, Paid)
            | (Active, Defaulted)
    )
}

/// Result of a successful approval
#[derive(Debug, Clone, serde::Serialize)]
pub struct ApprovalResult {
    pub loan_request: loan_requests::Model,
    pub deployment: DeployResult,
}

#[derive(Clone)]
pub struct LoanLifecycleService {
    store: LoanRequestStore,
    ledger: VaultLedgerService,
}

impl LoanLifecycleService {
    pub fn new(store: LoanRequestStore, ledger: VaultLedgerService) -> Self {
        Self { store, ledger }
    }

    pub async fn create(&self, new: &NewLoanRequest) -> Result<loan_requests::Model, AppError> {
        let loan = self.store.create(new).await?;
        info!(
            loan_request_id = loan.id,
            borrower = %loan.borrower_address,
            invoice_number = %loan.invoice_number,
            max_loan = %loan.max_loan,
            "Loan request created"
        );
        Ok(loan)
    }

    pub async fn get(&self, id: i32) -> Result<loan_requests::Model, AppError> {
        self.store.get_by_id(id).await
    }

    pub async fn list_by_status(&self, status: LoanStatus) -> Result<Vec<loan_requests::Model>, AppError> {
        self.store.list_by_status(status).await
    }

    pub async fn list_by_borrower(&self, address: &str, include_vaults: bool) -> Result<BorrowerLoans, AppError> {
        if !include_vaults {
            return Ok(BorrowerLoans::Plain(self.store.list_by_borrower(address).await?));
        }

        let rows = self.store.list_by_borrower_with_vault(address).await?;
        Ok(BorrowerLoans::WithVaults(
            rows.into_iter()
                .map(|(loan_request, vault)| LoanRequestWithVault { loan_request, vault })
                .collect(),
        ))
    }

    /// REQUESTED -> LISTED, then deploy the vault.
    ///
    /// The status is claimed with a conditional write so two concurrent
    /// approvals cannot both deploy. If anything fails before the factory
    /// call, or the factory call fails without broadcasting, the claim is
    /// released back to REQUESTED. Otherwise the request stays LISTED and the
    /// PENDING deployment intent is left for reconciliation.
    pub async fn approve(&self, id: i32) -> Result<ApprovalResult, AppError> {
        let loan = self.store.get_by_id(id).await?;

        if loan.status != LoanStatus::Requested {
            return Err(not_approvable(id, loan.status));
        }

        if !self
            .store
            .compare_and_set_status(id, LoanStatus::Requested, LoanStatus::Listed)
            .await?
        {
            let current = self.store.get_by_id(id).await?;
            return Err(not_approvable(id, current.status));
        }

        let max_loan = from_storage("loan_requests.max_loan", &loan.max_loan)?;
        let maturity_date = loan
            .invoice_due_date
            .and_time(NaiveTime::MIN)
            .and_utc()
            .timestamp();

        let params = CreateVaultParams {
            invoice_name: loan.customer_name.clone(),
            invoice_number: loan.invoice_number.clone(),
            borrower_address: loan.borrower_address.clone(),
            invoice_amount: max_loan,
            maturity_date,
            loan_request_id: Some(id),
        };

        info!(loan_request_id = id, maturity_date = maturity_date, "Loan request listed, deploying vault");

        let intent = match self.ledger.begin_deployment(&params).await {
            Ok(intent) => intent,
            Err(e) => {
                self.release_claim(id, &e).await?;
                return Err(e);
            }
        };

        let deployment = match self.ledger.deploy_from_intent(intent, &params).await {
            Ok(deployment) => deployment,
            Err(e) => {
                if never_broadcast(&e) {
                    self.release_claim(id, &e).await?;
                } else {
                    error!(loan_request_id = id, error = %e, "Vault deployment outcome unknown; loan request stays LISTED");
                }
                return Err(e);
            }
        };

        let loan_request = self.store.get_by_id(id).await?;
        info!(
            loan_request_id = id,
            vault_address = %deployment.vault_address,
            tx_hash = %deployment.tx_hash,
            "Loan request approved"
        );

        Ok(ApprovalResult {
            loan_request,
            deployment,
        })
    }

    /// LISTED -> REQUESTED after a deployment that provably never happened
    async fn release_claim(&self, id: i32, cause: &AppError) -> Result<(), AppError> {
        warn!(loan_request_id = id, error = %cause, "Vault deployment failed, returning loan request to REQUESTED");
        if !self
            .store
            .compare_and_set_status(id, LoanStatus::Listed, LoanStatus::Requested)
            .await?
        {
            warn!(loan_request_id = id, "Loan request left LISTED before it could be reverted");
        }
        Ok(())
    }

    /// Guarded status change for every transition except approval
    pub async fn change_status(&self, id: i32, status: LoanStatus) -> Result<loan_requests::Model, AppError> {
        let loan = self.store.get_by_id(id).await?;

        if status == LoanStatus::Listed {
            return Err(AppError::Precondition(format!(
                "Loan request {} can only become LISTED through approval",
                id
            )));
        }
        if !is_allowed_transition(loan.status, status) {
            return Err(AppError::Precondition(format!(
                "Cannot change loan request {} from {} to {}",
                id, loan.status, status
            )));
        }

        if !self.store.compare_and_set_status(id, loan.status, status).await? {
            let current = self.store.get_by_id(id).await?;
            return Err(AppError::Precondition(format!(
                "Loan request {} changed to {} concurrently",
                id, current.status
            )));
        }

        info!(loan_request_id = id, from = %loan.status, to = %status, "Loan status changed");
        self.store.get_by_id(id).await
    }

    pub async fn stats_by_borrower(&self, address: &str) -> Result<LoanStats, AppError> {
        Ok(LoanStats {
            active: self.store.count_by_status_for_borrower(address, LoanStatus::Active).await?,
            paid: self.store.count_by_status_for_borrower(address, LoanStatus::Paid).await?,
            defaulted: self
                .store
                .count_by_status_for_borrower(address, LoanStatus::Defaulted)
                .await?,
            listed: self.store.count_by_status_for_borrower(address, LoanStatus::Listed).await?,
        })
    }

    pub async fn details(&self, id: i32) -> Result<LoanRequestDetails, AppError> {
        let loan_request = self.store.get_by_id(id).await?;
        let vaults = self.ledger.vault_details_for_loan(id).await?;

        let mut total_funded = Decimal::ZERO;
        let mut total_repaid = Decimal::ZERO;
        for details in &vaults {
            for lender in &details.lenders {
                total_funded += from_storage("vault_lenders.amount", &lender.amount)?;
            }
            for repayment in &details.repayments {
                total_repaid += from_storage("vault_repayments.net_amount", &repayment.net_amount)?;
            }
        }

        let accrued = accrued_debt(
            from_storage("loan_requests.max_loan", &loan_request.max_loan)?,
            from_storage("loan_requests.monthly_interest_rate", &loan_request.monthly_interest_rate)?,
            loan_request.term,
        )
        .ok_or_else(|| {
            AppError::Validation(format!("Accrued debt for loan request {} is out of range", id))
        })?;

        Ok(LoanRequestDetails {
            loan_request,
            vaults,
            total_funded: total_funded.normalize(),
            total_repaid: total_repaid.normalize(),
            accrued_debt: accrued.normalize(),
            outstanding_balance: outstanding_balance(accrued, total_repaid).normalize(),
        })
    }
}

fn not_approvable(id: i32, status: LoanStatus) -> AppError {
    AppError::Precondition(format!(
        "Loan request {} cannot be approved: current status is {}, expected REQUESTED",
        id, status
    ))
}

/// A factory call that failed without reaching the chain. Any other error
/// after the call leaves the outcome unknown.
fn never_broadcast(err: &AppError) -> bool {
    matches!(err, AppError::Chain(e) if e.nothing_broadcast())
}
