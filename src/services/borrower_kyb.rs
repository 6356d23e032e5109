//! Borrower KYB records

use chrono::Utc;
use sea_orm::{
    sea_query::{Expr, Func},
    ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, Set,
};
use tracing::info;

use crate::entities::{borrower_kyb, prelude::*};
use crate::error::AppError;
use crate::models::kyb::NewKyb;
use crate::services::amounts::to_storage;
use crate::services::sanitize::sanitize_address;

#[derive(Clone)]
pub struct BorrowerKybService {
    db: DatabaseConnection,
}

impl BorrowerKybService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// One record per wallet; a second submission is a conflict
    pub async fn create(&self, kyb: &NewKyb) -> Result<borrower_kyb::Model, AppError> {
        if self.has_kyb(&kyb.wallet_address).await? {
            return Err(AppError::Conflict(format!(
                "KYB already submitted for {}",
                kyb.wallet_address
            )));
        }

        let model = borrower_kyb::ActiveModel {
            wallet_address: Set(kyb.wallet_address.clone()),
            legal_name: Set(kyb.legal_name.clone()),
            country: Set(kyb.country.clone()),
            registration_number: Set(kyb.registration_number.clone()),
            description: Set(kyb.description.clone()),
            ubo_name: Set(kyb.ubo_name.clone()),
            average_invoice_amount: Set(to_storage(kyb.average_invoice_amount)),
            created_at: Set(Utc::now().fixed_offset()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(|e| match AppError::from(e) {
            // Lost a race with a concurrent submission for the same wallet
            AppError::Conflict(_) => {
                AppError::Conflict(format!("KYB already submitted for {}", kyb.wallet_address))
            }
            other => other,
        })?;

        info!(kyb_id = model.id, wallet = %model.wallet_address, "Borrower KYB created");
        Ok(model)
    }

    /// Case-insensitive on both sides
    pub async fn has_kyb(&self, wallet_address: &str) -> Result<bool, AppError> {
        let count = BorrowerKyb::find()
            .filter(
                Expr::expr(Func::lower(Expr::col(borrower_kyb::Column::WalletAddress)))
                    .eq(sanitize_address(wallet_address)),
            )
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }
}
