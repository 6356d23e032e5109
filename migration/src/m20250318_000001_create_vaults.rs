use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Vaults::Table)
                    .if_not_exists()
                    .col(pk_auto(Vaults::Id))
                    .col(
                        ColumnDef::new(Vaults::VaultAddress)
                            .string_len(42)
                            .not_null()
                            .unique_key(),
                    )
                    .col(string_len(Vaults::BorrowerAddress, 42).not_null())
                    .col(integer_null(Vaults::LoanRequestId))
                    .col(string_len(Vaults::Name, 255).not_null())
                    .col(string_len(Vaults::Symbol, 255).not_null())
                    .col(string_len(Vaults::MaxCapacity, 78).not_null())
                    .col(string_len(Vaults::CurrentCapacity, 78).not_null().default("0"))
                    .col(big_integer(Vaults::MaturityDate).not_null())
                    .col(string_len(Vaults::Status, 20).not_null().default("PENDING"))
                    .col(string_len_null(Vaults::DeployTxHash, 66))
                    .col(big_integer_null(Vaults::BlockNumber))
                    .col(timestamp_with_time_zone_null(Vaults::FundedAt))
                    .col(string_len_null(Vaults::FundReleaseTxHash, 66))
                    .col(timestamp_with_time_zone(Vaults::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp_with_time_zone(Vaults::UpdatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vaults_loan_request_id")
                            .from(Vaults::Table, Vaults::LoanRequestId)
                            .to(LoanRequests::Table, LoanRequests::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // At most one vault per loan request (NULLs are not compared)
        manager
            .create_index(
                Index::create()
                    .name("idx_vaults_loan_request_id")
                    .table(Vaults::Table)
                    .col(Vaults::LoanRequestId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_vaults_borrower_address")
                    .table(Vaults::Table)
                    .col(Vaults::BorrowerAddress)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Vaults::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Vaults {
    Table,
    Id,
    VaultAddress,
    BorrowerAddress,
    LoanRequestId,
    Name,
    Symbol,
    MaxCapacity,
    CurrentCapacity,
    MaturityDate,
    Status,
    DeployTxHash,
    BlockNumber,
    FundedAt,
    FundReleaseTxHash,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum LoanRequests {
    Table,
    Id,
}
