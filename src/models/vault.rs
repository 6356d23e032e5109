//! Vault API models

use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entities::{
    vault_deployments::DeploymentStatus, vault_lenders, vault_repayments, vaults,
    vaults::VaultStatus,
};
use crate::services::sanitize::{self, limits};
use crate::services::validation;

/// Body of POST /vaults. The admin path never links a loan request; that
/// link is made only by loan approval.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateVaultBody {
    #[serde(default, alias = "invoiceName")]
    pub invoice_name: Value,
    #[serde(default, alias = "invoiceNumber")]
    pub invoice_number: Value,
    #[serde(default, alias = "borrowerAddress")]
    pub borrower_address: Value,
    #[serde(default, alias = "invoiceAmount")]
    pub invoice_amount: Value,
    /// Unix seconds or `YYYY-MM-DD`
    #[serde(default, alias = "maturityDate")]
    pub maturity_date: Value,
}

/// Validated vault creation parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CreateVaultParams {
    pub invoice_name: String,
    pub invoice_number: String,
    pub borrower_address: String,
    /// Becomes the vault's max_capacity
    pub invoice_amount: Decimal,
    /// Unix seconds
    pub maturity_date: i64,
    /// Set by loan approval only
    pub loan_request_id: Option<i32>,
}

impl CreateVaultParams {
    pub fn vault_name(&self) -> String {
        format!("{}_{}_Vault", self.invoice_name, self.invoice_number)
    }

    pub fn vault_symbol(&self) -> String {
        format!("{}_{}", self.invoice_name, self.invoice_number)
    }
}

impl CreateVaultBody {
    pub fn into_params(self) -> Result<CreateVaultParams, String> {
        let invoice_name = sanitize::text_value(&self.invoice_name, limits::CUSTOMER_NAME);
        let invoice_number = sanitize::text_value(&self.invoice_number, limits::INVOICE_NUMBER);
        let borrower_address = sanitize::address_value(&self.borrower_address);
        let invoice_amount = sanitize::decimal_value(&self.invoice_amount);

        validation::validate_required("invoice_name", &invoice_name)?;
        validation::validate_required("invoice_number", &invoice_number)?;
        validation::validate_address("borrower_address", &borrower_address)?;
        validation::validate_positive_amount("invoice_amount", invoice_amount)?;
        let maturity_date = maturity_seconds(&self.maturity_date)?;

        Ok(CreateVaultParams {
            invoice_name,
            invoice_number,
            borrower_address,
            invoice_amount,
            maturity_date,
            loan_request_id: None,
        })
    }
}

fn maturity_seconds(value: &Value) -> Result<i64, String> {
    if let Value::String(raw) = value {
        let raw = sanitize::sanitize_text(raw, limits::SHORT);
        if raw.contains('-') {
            let date = validation::validate_date("maturity_date", &raw)?;
            return Ok(date.and_time(NaiveTime::MIN).and_utc().timestamp());
        }
    }
    let seconds = sanitize::integer_value(value);
    if seconds <= 0 {
        return Err("maturity_date must be a positive unix timestamp or YYYY-MM-DD date".to_string());
    }
    Ok(seconds)
}

/// Body of POST /vaults/{address}/deposits
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepositBody {
    #[serde(default, alias = "lenderAddress")]
    pub lender_address: Value,
    #[serde(default)]
    pub amount: Value,
    #[serde(default, alias = "txHash")]
    pub tx_hash: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewDeposit {
    pub lender_address: String,
    pub amount: Decimal,
    pub tx_hash: String,
}

impl DepositBody {
    pub fn into_deposit(self) -> Result<NewDeposit, String> {
        let lender_address = sanitize::address_value(&self.lender_address);
        let amount = sanitize::decimal_value(&self.amount);
        let tx_hash = sanitize::address_value(&self.tx_hash);

        validation::validate_address("lender_address", &lender_address)?;
        validation::validate_positive_amount("amount", amount)?;
        validation::validate_tx_hash("tx_hash", &tx_hash)?;

        Ok(NewDeposit {
            lender_address,
            amount,
            tx_hash,
        })
    }
}

/// Body of POST /vaults/{address}/repayments
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RepaymentBody {
    #[serde(default, alias = "grossAmount", alias = "amount")]
    pub gross_amount: Value,
    #[serde(default, alias = "txHash")]
    pub tx_hash: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRepayment {
    pub gross_amount: Decimal,
    pub tx_hash: String,
}

impl RepaymentBody {
    pub fn into_repayment(self) -> Result<NewRepayment, String> {
        let gross_amount = sanitize::decimal_value(&self.gross_amount);
        let tx_hash = sanitize::address_value(&self.tx_hash);

        validation::validate_positive_amount("gross_amount", gross_amount)?;
        validation::validate_tx_hash("tx_hash", &tx_hash)?;

        Ok(NewRepayment { gross_amount, tx_hash })
    }
}

/// Body of PATCH /vaults/{address}/status
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateVaultStatusBody {
    #[serde(default)]
    pub status: Value,
    #[serde(default, alias = "fundReleaseTxHash")]
    pub fund_release_tx_hash: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VaultStatusUpdate {
    pub status: VaultStatus,
    /// Required for RELEASED
    pub fund_release_tx_hash: Option<String>,
}

impl UpdateVaultStatusBody {
    pub fn into_update(self) -> Result<VaultStatusUpdate, String> {
        let raw = sanitize::text_value(&self.status, limits::STATUS);
        validation::validate_required("status", &raw)?;
        let status = raw.parse::<VaultStatus>()?;

        let fund_release_tx_hash = match &self.fund_release_tx_hash {
            Value::Null => None,
            other => {
                let hash = sanitize::address_value(other);
                validation::validate_tx_hash("fund_release_tx_hash", &hash)?;
                Some(hash)
            }
        };

        if status == VaultStatus::Released && fund_release_tx_hash.is_none() {
            return Err("fund_release_tx_hash is required when status is RELEASED".to_string());
        }

        Ok(VaultStatusUpdate {
            status,
            fund_release_tx_hash,
        })
    }
}

/// Body of POST /vaults/attach
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AttachVaultBody {
    #[serde(default, alias = "deploymentId")]
    pub deployment_id: Value,
    #[serde(default, alias = "vaultAddress")]
    pub vault_address: Value,
    #[serde(default, alias = "txHash")]
    pub tx_hash: Value,
    #[serde(default, alias = "blockNumber")]
    pub block_number: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttachVault {
    pub deployment_id: i32,
    pub vault_address: String,
    pub tx_hash: Option<String>,
    pub block_number: Option<i64>,
}

impl AttachVaultBody {
    pub fn into_attach(self) -> Result<AttachVault, String> {
        let deployment_id =
            validation::validate_positive_integer("deployment_id", sanitize::integer_value(&self.deployment_id))?;
        let vault_address = sanitize::address_value(&self.vault_address);
        validation::validate_address("vault_address", &vault_address)?;

        let tx_hash = match &self.tx_hash {
            Value::Null => None,
            other => {
                let hash = sanitize::address_value(other);
                validation::validate_tx_hash("tx_hash", &hash)?;
                Some(hash)
            }
        };

        let block_number = match &self.block_number {
            Value::Null => None,
            other => match sanitize::integer_value(other) {
                n if n > 0 => Some(n),
                _ => return Err("block_number must be a positive integer".to_string()),
            },
        };

        Ok(AttachVault {
            deployment_id,
            vault_address,
            tx_hash,
            block_number,
        })
    }
}

/// Outcome of a vault deployment
#[derive(Debug, Clone, Serialize)]
pub struct DeployResult {
    pub vault_address: String,
    pub tx_hash: String,
    pub block_number: u64,
    pub explorer_url: String,
    pub address_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_url: Option<String>,
    pub vault: vaults::Model,
}

#[derive(Debug, Clone, Serialize)]
pub struct DepositResult {
    pub vault: vaults::Model,
    pub lender: vault_lenders::Model,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepaymentResult {
    pub vault: vaults::Model,
    pub repayment: vault_repayments::Model,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnresolvedDeployment {
    pub deployment_id: i32,
    pub status: DeploymentStatus,
    pub loan_request_id: Option<i32>,
    pub error_message: Option<String>,
}

/// Result of a reconciliation pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileReport {
    /// Vault addresses recorded during this pass
    pub recorded: Vec<String>,
    /// Intents whose on-chain outcome is unknown; resolve with attach
    pub unresolved: Vec<UnresolvedDeployment>,
}
