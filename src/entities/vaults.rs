//! SeaORM Entity for vaults
//!
//! One on-chain escrow vault per funded invoice.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Vault lifecycle status. Only PENDING is written by this service on
/// creation; the rest follow chain events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "UPPERCASE")]
pub enum VaultStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "FUNDING")]
    Funding,
    #[sea_orm(string_value = "FUNDED")]
    Funded,
    #[sea_orm(string_value = "RELEASED")]
    Released,
    #[sea_orm(string_value = "REPAID")]
    Repaid,
    #[sea_orm(string_value = "REDEEMED")]
    Redeemed,
    #[sea_orm(string_value = "MATURED")]
    Matured,
    #[sea_orm(string_value = "DEFAULTED")]
    Defaulted,
}

impl std::fmt::Display for VaultStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            VaultStatus::Pending => "PENDING",
            VaultStatus::Funding => "FUNDING",
            VaultStatus::Funded => "FUNDED",
            VaultStatus::Released => "RELEASED",
            VaultStatus::Repaid => "REPAID",
            VaultStatus::Redeemed => "REDEEMED",
            VaultStatus::Matured => "MATURED",
            VaultStatus::Defaulted => "DEFAULTED",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for VaultStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Ok(VaultStatus::Pending),
            "FUNDING" => Ok(VaultStatus::Funding),
            "FUNDED" => Ok(VaultStatus::Funded),
            "RELEASED" => Ok(VaultStatus::Released),
            "REPAID" => Ok(VaultStatus::Repaid),
            "REDEEMED" => Ok(VaultStatus::Redeemed),
            "MATURED" => Ok(VaultStatus::Matured),
            "DEFAULTED" => Ok(VaultStatus::Defaulted),
            _ => Err(format!("Invalid vault status '{}'", s)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vaults")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Vault contract address (lowercase, 42 chars)
    #[sea_orm(unique)]
    pub vault_address: String,
    pub borrower_address: String,
    pub loan_request_id: Option<i32>,
    /// ERC4626 share name, e.g. "Acme_INV-001_Vault"
    pub name: String,
    pub symbol: String,
    /// Requested loan amount (decimal string)
    pub max_capacity: String,
    /// Total deposited by lenders so far (decimal string)
    pub current_capacity: String,
    /// Unix seconds
    pub maturity_date: i64,
    pub status: VaultStatus,
    pub deploy_tx_hash: Option<String>,
    pub block_number: Option<i64>,
    pub funded_at: Option<DateTimeWithTimeZone>,
    pub fund_release_tx_hash: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::loan_requests::Entity",
        from = "Column::LoanRequestId",
        to = "super::loan_requests::Column::Id"
    )]
    LoanRequests,
    #[sea_orm(has_many = "super::vault_lenders::Entity")]
    VaultLenders,
    #[sea_orm(has_many = "super::vault_repayments::Entity")]
    VaultRepayments,
}

impl Related<super::loan_requests::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LoanRequests.def()
    }
}

impl Related<super::vault_lenders::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VaultLenders.def()
    }
}

impl Related<super::vault_repayments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VaultRepayments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
