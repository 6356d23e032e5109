//! Migration to create the vault_repayments table
//!
//! gross_amount = net_amount + fee_amount for every row.

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VaultRepayments::Table)
                    .if_not_exists()
                    .col(pk_auto(VaultRepayments::Id))
                    .col(integer(VaultRepayments::VaultId).not_null())
                    .col(string_len(VaultRepayments::GrossAmount, 78).not_null())
                    .col(string_len(VaultRepayments::FeeAmount, 78).not_null())
                    .col(string_len(VaultRepayments::NetAmount, 78).not_null())
                    .col(
                        ColumnDef::new(VaultRepayments::TxHash)
                            .string_len(66)
                            .not_null()
                            .unique_key(),
                    )
                    .col(timestamp_with_time_zone(VaultRepayments::CreatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vault_repayments_vault_id")
                            .from(VaultRepayments::Table, VaultRepayments::VaultId)
                            .to(Vaults::Table, Vaults::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_vault_repayments_vault_id")
                    .table(VaultRepayments::Table)
                    .col(VaultRepayments::VaultId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VaultRepayments::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum VaultRepayments {
    Table,
    Id,
    VaultId,
    GrossAmount,
    FeeAmount,
    NetAmount,
    TxHash,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Vaults {
    Table,
    Id,
}
