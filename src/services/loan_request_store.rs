//! Persistence for loan requests

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::debug;

use crate::entities::{
    loan_requests::{self, LoanStatus},
    prelude::*,
    vaults,
};
use crate::error::AppError;
use crate::models::loan_request::NewLoanRequest;
use crate::services::amounts::to_storage;

#[derive(Clone)]
pub struct LoanRequestStore {
    db: DatabaseConnection,
}

impl LoanRequestStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Insert a new request in REQUESTED. Amounts are stored exactly as
    /// submitted.
    pub async fn create(&self, new: &NewLoanRequest) -> Result<loan_requests::Model, AppError> {
        let now = Utc::now().fixed_offset();

        let row = loan_requests::ActiveModel {
            invoice_number: Set(new.invoice_number.clone()),
            invoice_amount: Set(to_storage(new.invoice_amount)),
            invoice_due_date: Set(new.invoice_due_date),
            customer_name: Set(new.customer_name.clone()),
            term: Set(new.term),
            advance_rate: Set(to_storage(new.advance_rate)),
            monthly_interest_rate: Set(to_storage(new.monthly_interest_rate)),
            max_loan: Set(to_storage(new.max_loan)),
            delivery_completed: Set(new.delivery_completed),
            not_pledged: Set(new.not_pledged),
            assignment_signed: Set(new.assignment_signed),
            borrower_address: Set(new.borrower_address.clone()),
            status: Set(LoanStatus::Requested),
            created_at: Set(now),
            modified_at: Set(now),
            ..Default::default()
        };

        let model = row.insert(&self.db).await?;
        debug!(loan_request_id = model.id, borrower = %model.borrower_address, "Loan request stored");
        Ok(model)
    }

    pub async fn get_by_id(&self, id: i32) -> Result<loan_requests::Model, AppError> {
        LoanRequests::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan request {} not found", id)))
    }

    /// Newest first
    pub async fn list_by_borrower(&self, address: &str) -> Result<Vec<loan_requests::Model>, AppError> {
        Ok(LoanRequests::find()
            .filter(loan_requests::Column::BorrowerAddress.eq(address))
            .order_by_desc(loan_requests::Column::CreatedAt)
            .order_by_desc(loan_requests::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Newest first, left-joined with the vault (if any)
    pub async fn list_by_borrower_with_vault(
        &self,
        address: &str,
    ) -> Result<Vec<(loan_requests::Model, Option<vaults::Model>)>, AppError> {
        Ok(LoanRequests::find()
            .find_also_related(Vaults)
            .filter(loan_requests::Column::BorrowerAddress.eq(address))
            .order_by_desc(loan_requests::Column::CreatedAt)
            .order_by_desc(loan_requests::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn list_by_status(&self, status: LoanStatus) -> Result<Vec<loan_requests::Model>, AppError> {
        Ok(LoanRequests::find()
            .filter(loan_requests::Column::Status.eq(status))
            .order_by_desc(loan_requests::Column::CreatedAt)
            .order_by_desc(loan_requests::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Unconditional write; NotFound is decided by the affected-row count
    pub async fn update_status(&self, id: i32, status: LoanStatus) -> Result<(), AppError> {
        let result = LoanRequests::update_many()
            .set(loan_requests::ActiveModel {
                status: Set(status),
                modified_at: Set(Utc::now().fixed_offset()),
                ..Default::default()
            })
            .filter(loan_requests::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("Loan request {} not found", id)));
        }
        Ok(())
    }

    /// Write `to` only if the row is still in `from`. Returns whether the
    /// write happened.
    pub async fn compare_and_set_status(
        &self,
        id: i32,
        from: LoanStatus,
        to: LoanStatus,
    ) -> Result<bool, AppError> {
        let result = LoanRequests::update_many()
            .set(loan_requests::ActiveModel {
                status: Set(to),
                modified_at: Set(Utc::now().fixed_offset()),
                ..Default::default()
            })
            .filter(loan_requests::Column::Id.eq(id))
            .filter(loan_requests::Column::Status.eq(from))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected == 1)
    }

    pub async fn count_by_status_for_borrower(
        &self,
        address: &str,
        status: LoanStatus,
    ) -> Result<u64, AppError> {
        Ok(LoanRequests::find()
            .filter(loan_requests::Column::BorrowerAddress.eq(address))
            .filter(loan_requests::Column::Status.eq(status))
            .count(&self.db)
            .await?)
    }
}
