use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VaultLenders::Table)
                    .if_not_exists()
                    .col(pk_auto(VaultLenders::Id))
                    .col(integer(VaultLenders::VaultId).not_null())
                    .col(string_len(VaultLenders::LenderAddress, 42).not_null())
                    .col(string_len(VaultLenders::Amount, 78).not_null())
                    .col(
                        ColumnDef::new(VaultLenders::TxHash)
                            .string_len(66)
                            .not_null()
                            .unique_key(),
                    )
                    .col(timestamp_with_time_zone(VaultLenders::CreatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vault_lenders_vault_id")
                            .from(VaultLenders::Table, VaultLenders::VaultId)
                            .to(Vaults::Table, Vaults::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_vault_lenders_vault_id")
                    .table(VaultLenders::Table)
                    .col(VaultLenders::VaultId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VaultLenders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum VaultLenders {
    Table,
    Id,
    VaultId,
    LenderAddress,
    Amount,
    TxHash,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Vaults {
    Table,
    Id,
}
