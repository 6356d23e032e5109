//! SeaORM Entity for vault_repayments (one row per repayment transaction)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vault_repayments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub vault_id: i32,
    /// net_amount + fee_amount
    pub gross_amount: String,
    /// Protocol fee, 1% of gross
    pub fee_amount: String,
    /// Amount credited to the vault
    pub net_amount: String,
    #[sea_orm(unique)]
    pub tx_hash: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::vaults::Entity",
        from = "Column::VaultId",
        to = "super::vaults::Column::Id"
    )]
    Vaults,
}

impl Related<super::vaults::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vaults.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
