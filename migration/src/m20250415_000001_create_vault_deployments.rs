//! Migration to create the vault_deployments table
//!
//! Write-ahead record of every vault deployment attempt. A row is written
//! before the factory transaction is sent and moves PENDING -> DEPLOYED ->
//! RECORDED (or FAILED), so deployed-but-unrecorded vaults can be reconciled.

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VaultDeployments::Table)
                    .if_not_exists()
                    .col(pk_auto(VaultDeployments::Id))
                    .col(integer_null(VaultDeployments::LoanRequestId))
                    .col(string_len(VaultDeployments::BorrowerAddress, 42).not_null())
                    .col(string_len(VaultDeployments::Name, 255).not_null())
                    .col(string_len(VaultDeployments::Symbol, 255).not_null())
                    .col(string_len(VaultDeployments::MaxCapacity, 78).not_null())
                    .col(big_integer(VaultDeployments::MaturityDate).not_null())
                    .col(string_len(VaultDeployments::Status, 20).not_null().default("PENDING"))
                    .col(string_len_null(VaultDeployments::VaultAddress, 42))
                    .col(string_len_null(VaultDeployments::TxHash, 66))
                    .col(big_integer_null(VaultDeployments::BlockNumber))
                    .col(text_null(VaultDeployments::ErrorMessage))
                    .col(timestamp_with_time_zone(VaultDeployments::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp_with_time_zone(VaultDeployments::UpdatedAt).default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await?;

        // Reconciliation scans by status
        manager
            .create_index(
                Index::create()
                    .name("idx_vault_deployments_status")
                    .table(VaultDeployments::Table)
                    .col(VaultDeployments::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VaultDeployments::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum VaultDeployments {
    Table,
    Id,
    LoanRequestId,
    BorrowerAddress,
    Name,
    Symbol,
    MaxCapacity,
    MaturityDate,
    Status,
    VaultAddress,
    TxHash,
    BlockNumber,
    ErrorMessage,
    CreatedAt,
    UpdatedAt,
}
