//! Migration to create the borrower_kyb table
//!
//! Wallet addresses are stored lowercase; the unique index makes one KYB
//! record per wallet.

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BorrowerKyb::Table)
                    .if_not_exists()
                    .col(pk_auto(BorrowerKyb::Id))
                    .col(string_len(BorrowerKyb::WalletAddress, 42).not_null())
                    .col(string_len(BorrowerKyb::LegalName, 255).not_null())
                    .col(string_len(BorrowerKyb::Country, 100).not_null())
                    .col(string_len(BorrowerKyb::RegistrationNumber, 100).not_null())
                    .col(text(BorrowerKyb::Description).not_null())
                    .col(string_len(BorrowerKyb::UboName, 255).not_null())
                    .col(string_len(BorrowerKyb::AverageInvoiceAmount, 78).not_null())
                    .col(timestamp_with_time_zone(BorrowerKyb::CreatedAt).default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_borrower_kyb_wallet_address")
                    .table(BorrowerKyb::Table)
                    .col(BorrowerKyb::WalletAddress)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BorrowerKyb::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum BorrowerKyb {
    Table,
    Id,
    WalletAddress,
    LegalName,
    Country,
    RegistrationNumber,
    Description,
    UboName,
    AverageInvoiceAmount,
    CreatedAt,
}
