//! SeaORM Entity for vault_deployments
//!
//! Write-ahead record for vault deployments: PENDING before the factory
//! transaction is sent, DEPLOYED once the receipt yields an address,
//! RECORDED after the vault row is written, FAILED if the chain call failed.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "UPPERCASE")]
pub enum DeploymentStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "DEPLOYED")]
    Deployed,
    #[sea_orm(string_value = "RECORDED")]
    Recorded,
    #[sea_orm(string_value = "FAILED")]
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vault_deployments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub loan_request_id: Option<i32>,
    pub borrower_address: String,
    pub name: String,
    pub symbol: String,
    pub max_capacity: String,
    pub maturity_date: i64,
    pub status: DeploymentStatus,
    pub vault_address: Option<String>,
    pub tx_hash: Option<String>,
    pub block_number: Option<i64>,
    pub error_message: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
