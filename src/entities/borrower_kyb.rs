//! `SeaORM` Entity for borrower_kyb table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "borrower_kyb")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Stored lowercase; unique
    #[sea_orm(unique)]
    pub wallet_address: String,
    pub legal_name: String,
    pub country: String,
    pub registration_number: String,
    pub description: String,
    pub ubo_name: String,
    pub average_invoice_amount: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
