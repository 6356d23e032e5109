pub use sea_orm_migration::prelude::*;

mod m20250310_000001_create_loan_requests;
mod m20250310_000002_create_borrower_kyb;
mod m20250318_000001_create_vaults;
mod m20250318_000002_create_vault_lenders;
mod m20250402_000001_create_vault_repayments;
mod m20250415_000001_create_vault_deployments;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250310_000001_create_loan_requests::Migration),
            Box::new(m20250310_000002_create_borrower_kyb::Migration),
            Box::new(m20250318_000001_create_vaults::Migration),
            Box::new(m20250318_000002_create_vault_lenders::Migration),
            Box::new(m20250402_000001_create_vault_repayments::Migration),
            Box::new(m20250415_000001_create_vault_deployments::Migration),
        ]
    }
}
