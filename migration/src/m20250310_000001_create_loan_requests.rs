//! Migration to create the loan_requests table
//!
//! One row per invoice submitted for financing. Status is stored as its
//! uppercase string form (REQUESTED, LISTED, ...).

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LoanRequests::Table)
                    .if_not_exists()
                    .col(pk_auto(LoanRequests::Id))
                    .col(string_len(LoanRequests::InvoiceNumber, 100).not_null())
                    .col(string_len(LoanRequests::InvoiceAmount, 78).not_null())
                    .col(date(LoanRequests::InvoiceDueDate).not_null())
                    .col(string_len(LoanRequests::CustomerName, 255).not_null())
                    .col(integer(LoanRequests::Term).not_null())
                    .col(string_len(LoanRequests::AdvanceRate, 78).not_null())
                    .col(string_len(LoanRequests::MonthlyInterestRate, 78).not_null())
                    .col(string_len(LoanRequests::MaxLoan, 78).not_null())
                    .col(boolean(LoanRequests::DeliveryCompleted).default(false))
                    .col(boolean(LoanRequests::NotPledged).default(false))
                    .col(boolean(LoanRequests::AssignmentSigned).default(false))
                    .col(string_len(LoanRequests::BorrowerAddress, 42).not_null())
                    .col(string_len(LoanRequests::Status, 20).not_null().default("REQUESTED"))
                    .col(timestamp_with_time_zone(LoanRequests::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp_with_time_zone(LoanRequests::ModifiedAt).default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await?;

        // Borrower dashboards list and count by address
        manager
            .create_index(
                Index::create()
                    .name("idx_loan_requests_borrower_address")
                    .table(LoanRequests::Table)
                    .col(LoanRequests::BorrowerAddress)
                    .to_owned(),
            )
            .await?;

        // Admin queues list by status
        manager
            .create_index(
                Index::create()
                    .name("idx_loan_requests_status")
                    .table(LoanRequests::Table)
                    .col(LoanRequests::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LoanRequests::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum LoanRequests {
    Table,
    Id,
    InvoiceNumber,
    InvoiceAmount,
    InvoiceDueDate,
    CustomerName,
    Term,
    AdvanceRate,
    MonthlyInterestRate,
    MaxLoan,
    DeliveryCompleted,
    NotPledged,
    AssignmentSigned,
    BorrowerAddress,
    Status,
    CreatedAt,
    ModifiedAt,
}
