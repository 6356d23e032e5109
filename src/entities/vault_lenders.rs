//! SeaORM Entity for vault_lenders (one row per lender deposit)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vault_lenders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub vault_id: i32,
    pub lender_address: String,
    /// Deposit amount (decimal string)
    pub amount: String,
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
