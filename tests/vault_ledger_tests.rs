//! Vault ledger: deployment, deposits, repayments and recovery

mod common;

use common::*;
use invoice_factoring_backend::{
    entities::{
        prelude::*,
        vault_deployments::{self, DeploymentStatus},
        vault_lenders,
        vaults::{self, VaultStatus},
    },
    error::AppError,
    models::vault::{AttachVault, CreateVaultParams, NewDeposit, NewRepayment, VaultStatusUpdate},
    services::chain_gateway::ChainError,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};

fn direct_params() -> CreateVaultParams {
    CreateVaultParams {
        invoice_name: "Globex".to_string(),
        invoice_number: "G-17".to_string(),
        borrower_address: BORROWER.to_string(),
        invoice_amount: dec!(1000),
        maturity_date: 1_767_139_200,
        loan_request_id: None,
    }
}

fn deposit(lender: &str, amount: Decimal, n: u64) -> NewDeposit {
    NewDeposit {
        lender_address: lender.to_string(),
        amount,
        tx_hash: deposit_tx(n),
    }
}

#[tokio::test]
async fn test_create_vault_without_loan_request() {
    let app = setup_app().await;

    let result = app.state.vaults.create_vault(&direct_params()).await.unwrap();

    assert_eq!(result.vault.name, "Globex_G-17_Vault");
    assert_eq!(result.vault.symbol, "Globex_G-17");
    assert_eq!(result.vault.status, VaultStatus::Pending);
    assert_eq!(result.vault.loan_request_id, None);
    assert_eq!(result.vault.deploy_tx_hash.as_deref(), Some(fake_tx_hash(1).as_str()));
    assert_eq!(result.block_number, 1_001);
    assert_eq!(
        result.address_url,
        format!("https://sepolia.basescan.org/address/{}", fake_vault_address(1))
    );
}

#[tokio::test]
async fn test_create_vault_for_unknown_loan_is_not_found() {
    let app = setup_app().await;
    let mut params = direct_params();
    params.loan_request_id = Some(77);

    let err = app.state.vaults.create_vault(&params).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(app.gateway.deploy_count(), 0);
}

#[tokio::test]
async fn test_missing_creation_event_leaves_pending_intent() {
    let app = setup_app().await;
    app.gateway.set_behavior(DeployBehavior::Fail(ChainError::EventParsing(
        "VaultCreated event not found in transaction receipt".into(),
    )));

    let err = app.state.vaults.create_vault(&direct_params()).await.unwrap_err();
    assert!(matches!(err, AppError::Chain(ChainError::EventParsing(_))));
    // Not retried
    assert_eq!(app.gateway.deploy_count(), 1);

    let intent = VaultDeployments::find().one(&app.db).await.unwrap().unwrap();
    assert_eq!(intent.status, DeploymentStatus::Pending);
    assert_eq!(Vaults::find().count(&app.db).await.unwrap(), 0);
}

#[tokio::test]
async fn test_two_deposits_accumulate() {
    let app = setup_app().await;
    let vault = app.state.vaults.create_vault(&direct_params()).await.unwrap().vault;

    let first = app
        .state
        .vaults
        .record_deposit(&vault.vault_address, &deposit(LENDER_A, dec!(100), 1))
        .await
        .unwrap();
    assert_eq!(first.vault.current_capacity, "100");
    assert_eq!(first.lender.amount, "100");

    let second = app
        .state
        .vaults
        .record_deposit(&vault.vault_address, &deposit(LENDER_B, dec!(250), 2))
        .await
        .unwrap();
    assert_eq!(second.vault.current_capacity, "350");

    let stored = app.state.vaults.get_vault(&vault.vault_address).await.unwrap();
    assert_eq!(stored.current_capacity, "350");

    let lenders = app.state.vaults.get_vault_lenders(&vault.vault_address).await.unwrap();
    assert_eq!(lenders.len(), 2);
    // Newest first
    assert_eq!(lenders[0].lender_address, LENDER_B);
    assert_eq!(lenders[1].lender_address, LENDER_A);
}

#[tokio::test]
async fn test_fractional_deposits_sum_exactly() {
    let app = setup_app().await;
    let vault = app.state.vaults.create_vault(&direct_params()).await.unwrap().vault;

    for n in 0..10 {
        app.state
            .vaults
            .record_deposit(&vault.vault_address, &deposit(LENDER_A, dec!(0.1), n))
            .await
            .unwrap();
    }

    let stored = app.state.vaults.get_vault(&vault.vault_address).await.unwrap();
    assert_eq!(stored.current_capacity, "1");
}

#[tokio::test]
async fn test_duplicate_deposit_tx_changes_nothing() {
    let app = setup_app().await;
    let vault = app.state.vaults.create_vault(&direct_params()).await.unwrap().vault;

    app.state
        .vaults
        .record_deposit(&vault.vault_address, &deposit(LENDER_A, dec!(100), 1))
        .await
        .unwrap();

    // Same tx hash: the lender insert fails, so the capacity increment
    // must not happen either
    let err = app
        .state
        .vaults
        .record_deposit(&vault.vault_address, &deposit(LENDER_B, dec!(500), 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let stored = app.state.vaults.get_vault(&vault.vault_address).await.unwrap();
    assert_eq!(stored.current_capacity, "100");
    let rows = VaultLenders::find()
        .filter(vault_lenders::Column::VaultId.eq(vault.id))
        .count(&app.db)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn test_deposit_into_unknown_vault() {
    let app = setup_app().await;
    let err = app
        .state
        .vaults
        .record_deposit(&fake_vault_address(404), &deposit(LENDER_A, dec!(1), 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(VaultLenders::find().count(&app.db).await.unwrap(), 0);
}

#[tokio::test]
async fn test_over_capacity_deposit_is_recorded() {
    let app = setup_app().await;
    let vault = app.state.vaults.create_vault(&direct_params()).await.unwrap().vault;

    let result = app
        .state
        .vaults
        .record_deposit(&vault.vault_address, &deposit(LENDER_A, dec!(1200), 1))
        .await
        .unwrap();
    assert_eq!(result.vault.current_capacity, "1200");
}

#[tokio::test]
async fn test_deposit_past_decimal_range_is_rejected() {
    let app = setup_app().await;
    let vault = app.state.vaults.create_vault(&direct_params()).await.unwrap().vault;

    let mut full: vaults::ActiveModel = vault.clone().into();
    full.current_capacity = Set(Decimal::MAX.to_string());
    full.update(&app.db).await.unwrap();

    let err = app
        .state
        .vaults
        .record_deposit(&vault.vault_address, &deposit(LENDER_A, dec!(1), 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // Lender insert rolled back with the failed increment
    assert_eq!(VaultLenders::find().count(&app.db).await.unwrap(), 0);
    let reloaded = app.state.vaults.get_vault(&vault.vault_address).await.unwrap();
    assert_eq!(reloaded.current_capacity, Decimal::MAX.to_string());
}

#[tokio::test]
async fn test_repayment_splits_fee() {
    let app = setup_app().await;
    let vault = app.state.vaults.create_vault(&direct_params()).await.unwrap().vault;

    let result = app
        .state
        .vaults
        .record_repayment(
            &vault.vault_address,
            &NewRepayment {
                gross_amount: dec!(123.45),
                tx_hash: deposit_tx(50),
            },
        )
        .await
        .unwrap();

    assert_eq!(result.repayment.gross_amount, "123.45");
    assert_eq!(result.repayment.fee_amount, "1.2345");
    assert_eq!(result.repayment.net_amount, "122.2155");

    let repayments = app.state.vaults.get_vault_repayments(&vault.vault_address).await.unwrap();
    assert_eq!(repayments.len(), 1);
}

#[tokio::test]
async fn test_list_vaults_newest_first() {
    let app = setup_app().await;
    let first = app.state.vaults.create_vault(&direct_params()).await.unwrap();
    let second = app.state.vaults.create_vault(&direct_params()).await.unwrap();

    let vaults = app.state.vaults.get_all_vaults().await.unwrap();
    assert_eq!(
        vaults.iter().map(|v| v.vault_address.clone()).collect::<Vec<_>>(),
        vec![second.vault_address, first.vault_address]
    );
}

#[tokio::test]
async fn test_release_sets_funded_at() {
    let app = setup_app().await;
    let vault = app.state.vaults.create_vault(&direct_params()).await.unwrap().vault;

    let funding = app
        .state
        .vaults
        .update_vault_status(
            &vault.vault_address,
            &VaultStatusUpdate {
                status: VaultStatus::Funding,
                fund_release_tx_hash: None,
            },
        )
        .await
        .unwrap();
    assert!(funding.funded_at.is_none());

    let released = app
        .state
        .vaults
        .update_vault_status(
            &vault.vault_address,
            &VaultStatusUpdate {
                status: VaultStatus::Released,
                fund_release_tx_hash: Some(deposit_tx(77)),
            },
        )
        .await
        .unwrap();
    assert_eq!(released.status, VaultStatus::Released);
    assert!(released.funded_at.is_some());
    assert_eq!(released.fund_release_tx_hash, Some(deposit_tx(77)));
}

/// Simulate a crash after the factory confirmed but before the vault row
/// was written: the intent is DEPLOYED with an address
async fn orphaned_intent(app: &TestApp) -> vault_deployments::Model {
    let now = chrono::Utc::now().fixed_offset();
    vault_deployments::ActiveModel {
        loan_request_id: Set(None),
        borrower_address: Set(BORROWER.to_string()),
        name: Set("Initech_I-9_Vault".to_string()),
        symbol: Set("Initech_I-9".to_string()),
        max_capacity: Set("500".to_string()),
        maturity_date: Set(1_767_139_200),
        status: Set(DeploymentStatus::Deployed),
        vault_address: Set(Some(fake_vault_address(90))),
        tx_hash: Set(Some(fake_tx_hash(90))),
        block_number: Set(Some(4_242)),
        error_message: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&app.db)
    .await
    .unwrap()
}

#[tokio::test]
async fn test_reconcile_records_orphaned_vault() {
    let app = setup_app().await;
    let intent = orphaned_intent(&app).await;

    app.gateway.set_behavior(DeployBehavior::Hang);
    app.state.vaults.create_vault(&direct_params()).await.unwrap_err();

    let report = app.state.vaults.reconcile_deployments().await.unwrap();
    assert_eq!(report.recorded, vec![fake_vault_address(90)]);
    assert_eq!(report.unresolved.len(), 1);
    assert_eq!(report.unresolved[0].status, DeploymentStatus::Pending);

    let vault = app.state.vaults.get_vault(&fake_vault_address(90)).await.unwrap();
    assert_eq!(vault.max_capacity, "500");
    assert_eq!(vault.current_capacity, "0");
    assert_eq!(vault.block_number, Some(4_242));

    let intent = VaultDeployments::find_by_id(intent.id).one(&app.db).await.unwrap().unwrap();
    assert_eq!(intent.status, DeploymentStatus::Recorded);

    // Second pass has nothing left to record
    let again = app.state.vaults.reconcile_deployments().await.unwrap();
    assert!(again.recorded.is_empty());
    assert_eq!(Vaults::find().count(&app.db).await.unwrap(), 1);
}

#[tokio::test]
async fn test_attach_is_idempotent() {
    let app = setup_app().await;
    app.gateway.set_behavior(DeployBehavior::Hang);
    app.state.vaults.create_vault(&direct_params()).await.unwrap_err();
    let intent = VaultDeployments::find().one(&app.db).await.unwrap().unwrap();

    let attach = AttachVault {
        deployment_id: intent.id,
        vault_address: fake_vault_address(7),
        tx_hash: Some(fake_tx_hash(7)),
        block_number: Some(9_000),
    };

    let first = app.state.vaults.attach_vault(&attach).await.unwrap();
    let second = app.state.vaults.attach_vault(&attach).await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(first.max_capacity, "1000");
    assert_eq!(Vaults::find().count(&app.db).await.unwrap(), 1);

    // A different address for a recorded deployment is refused
    let err = app
        .state
        .vaults
        .attach_vault(&AttachVault {
            vault_address: fake_vault_address(8),
            ..attach.clone()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Precondition(_)));
}

#[tokio::test]
async fn test_attach_unknown_deployment() {
    let app = setup_app().await;
    let err = app
        .state
        .vaults
        .attach_vault(&AttachVault {
            deployment_id: 5,
            vault_address: fake_vault_address(1),
            tx_hash: None,
            block_number: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_vault_row_links_back_to_loan() {
    let app = setup_app().await;
    let loan = app.state.loans.create(&sample_loan()).await.unwrap();
    app.state.loans.approve(loan.id).await.unwrap();

    let linked = Vaults::find()
        .filter(vaults::Column::LoanRequestId.eq(loan.id))
        .count(&app.db)
        .await
        .unwrap();
    assert_eq!(linked, 1);

    // Approving again is refused before any chain call
    let err = app.state.loans.approve(loan.id).await.unwrap_err();
    assert!(matches!(err, AppError::Precondition(_)));
    assert_eq!(app.gateway.deploy_count(), 1);
}
