//! Loan request lifecycle against a real (in-memory) database

mod common;

use common::*;
use invoice_factoring_backend::{
    entities::{
        loan_requests::{self, LoanStatus},
        prelude::*,
        vault_deployments::{self, DeploymentStatus},
        vaults,
    },
    error::AppError,
    models::{
        loan_request::BorrowerLoans,
        vault::{CreateVaultParams, NewDeposit, NewRepayment},
    },
    services::chain_gateway::ChainError,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};

async fn force_status(app: &TestApp, id: i32, status: LoanStatus) {
    LoanRequests::update_many()
        .set(loan_requests::ActiveModel {
            status: sea_orm::Set(status),
            ..Default::default()
        })
        .filter(loan_requests::Column::Id.eq(id))
        .exec(&app.db)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_create_stores_amounts_as_submitted() {
    let app = setup_app().await;

    let loan = app.state.loans.create(&sample_loan()).await.unwrap();

    assert_eq!(loan.status, LoanStatus::Requested);
    assert_eq!(loan.invoice_amount, "10000");
    assert_eq!(loan.advance_rate, "0.8");
    assert_eq!(loan.max_loan, "8000");

    let stored = app.state.loans.get(loan.id).await.unwrap();
    assert_eq!(stored.invoice_amount, "10000");
    assert_eq!(stored.max_loan, "8000");
    assert_eq!(stored.invoice_due_date, loan.invoice_due_date);
    assert_eq!(stored.borrower_address, BORROWER);
}

#[tokio::test]
async fn test_get_missing_is_not_found() {
    let app = setup_app().await;
    let err = app.state.loans.get(4242).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_approve_lists_and_deploys_one_vault() {
    let app = setup_app().await;
    let loan = app.state.loans.create(&sample_loan()).await.unwrap();

    let result = app.state.loans.approve(loan.id).await.unwrap();

    assert_eq!(result.loan_request.status, LoanStatus::Listed);
    assert_eq!(result.deployment.vault_address, fake_vault_address(1));
    assert_eq!(
        result.deployment.explorer_url,
        format!("https://sepolia.basescan.org/tx/{}", fake_tx_hash(1))
    );
    assert!(result.deployment.debug_url.is_some());

    let vaults = Vaults::find()
        .filter(vaults::Column::LoanRequestId.eq(loan.id))
        .all(&app.db)
        .await
        .unwrap();
    assert_eq!(vaults.len(), 1);
    assert_eq!(vaults[0].max_capacity, "8000");
    assert_eq!(vaults[0].current_capacity, "0");
    assert_eq!(vaults[0].name, "Acme_INV-001_Vault");
    assert_eq!(vaults[0].symbol, "Acme_INV-001");

    // Due date 2025-12-31 at 00:00 UTC
    let request = app.gateway.last_request().unwrap();
    assert_eq!(request.maturity_date, 1_767_139_200);
    assert_eq!(request.max_capacity, dec!(8000));

    let intent = VaultDeployments::find().one(&app.db).await.unwrap().unwrap();
    assert_eq!(intent.status, DeploymentStatus::Recorded);
}

#[tokio::test]
async fn test_approve_only_from_requested() {
    let app = setup_app().await;

    for status in [
        LoanStatus::Rejected,
        LoanStatus::Listed,
        LoanStatus::Active,
        LoanStatus::Paid,
        LoanStatus::Canceled,
        LoanStatus::Defaulted,
    ] {
        let loan = app.state.loans.create(&sample_loan()).await.unwrap();
        force_status(&app, loan.id, status).await;

        let err = app.state.loans.approve(loan.id).await.unwrap_err();
        match err {
            AppError::Precondition(msg) => assert!(msg.contains(status.as_str()), "{}", msg),
            other => panic!("expected precondition error, got {:?}", other),
        }

        let reloaded = app.state.loans.get(loan.id).await.unwrap();
        assert_eq!(reloaded.status, status);
    }

    assert_eq!(app.gateway.deploy_count(), 0);
}

#[tokio::test]
async fn test_approve_reverts_when_deployment_reverted() {
    let app = setup_app().await;
    let loan = app.state.loans.create(&sample_loan()).await.unwrap();
    app.gateway
        .set_behavior(DeployBehavior::Fail(ChainError::Reverted("out of gas".into())));

    let err = app.state.loans.approve(loan.id).await.unwrap_err();
    assert!(matches!(err, AppError::Chain(ChainError::Reverted(_))));

    let reloaded = app.state.loans.get(loan.id).await.unwrap();
    assert_eq!(reloaded.status, LoanStatus::Requested);

    let intent = VaultDeployments::find().one(&app.db).await.unwrap().unwrap();
    assert_eq!(intent.status, DeploymentStatus::Failed);
    assert!(intent.error_message.unwrap().contains("out of gas"));

    // A failed attempt does not block a fresh approval
    app.gateway.set_behavior(DeployBehavior::Succeed);
    let result = app.state.loans.approve(loan.id).await.unwrap();
    assert_eq!(result.loan_request.status, LoanStatus::Listed);
}

#[tokio::test]
async fn test_approve_timeout_keeps_listed_and_pending_intent() {
    let app = setup_app().await;
    let loan = app.state.loans.create(&sample_loan()).await.unwrap();
    app.gateway.set_behavior(DeployBehavior::Hang);

    let err = app.state.loans.approve(loan.id).await.unwrap_err();
    assert!(matches!(err, AppError::Chain(ChainError::Timeout(_))));

    let reloaded = app.state.loans.get(loan.id).await.unwrap();
    assert_eq!(reloaded.status, LoanStatus::Listed);

    let intent = VaultDeployments::find().one(&app.db).await.unwrap().unwrap();
    assert_eq!(intent.status, DeploymentStatus::Pending);
    assert_eq!(Vaults::find().count(&app.db).await.unwrap(), 0);
}

#[tokio::test]
async fn test_change_status_follows_transition_table() {
    let app = setup_app().await;
    let loan = app.state.loans.create(&sample_loan()).await.unwrap();

    // LISTED only through approval
    let err = app
        .state
        .loans
        .change_status(loan.id, LoanStatus::Listed)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Precondition(_)));

    let err = app
        .state
        .loans
        .change_status(loan.id, LoanStatus::Paid)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Precondition(_)));

    app.state.loans.approve(loan.id).await.unwrap();
    let active = app.state.loans.change_status(loan.id, LoanStatus::Active).await.unwrap();
    assert_eq!(active.status, LoanStatus::Active);
    assert!(active.modified_at >= loan.modified_at);

    let paid = app.state.loans.change_status(loan.id, LoanStatus::Paid).await.unwrap();
    assert_eq!(paid.status, LoanStatus::Paid);

    // Terminal
    let err = app
        .state
        .loans
        .change_status(loan.id, LoanStatus::Defaulted)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Precondition(_)));
}

#[tokio::test]
async fn test_change_status_missing_loan() {
    let app = setup_app().await;
    let err = app
        .state
        .loans
        .change_status(99, LoanStatus::Canceled)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_stats_match_direct_counts() {
    let app = setup_app().await;
    let statuses = [
        LoanStatus::Active,
        LoanStatus::Active,
        LoanStatus::Paid,
        LoanStatus::Defaulted,
        LoanStatus::Listed,
        LoanStatus::Listed,
        LoanStatus::Listed,
        LoanStatus::Requested,
        LoanStatus::Canceled,
    ];
    for status in statuses {
        let loan = app.state.loans.create(&sample_loan()).await.unwrap();
        force_status(&app, loan.id, status).await;
    }

    // Another borrower's loans never count
    let mut other = sample_loan();
    other.borrower_address = LENDER_A.to_string();
    let foreign = app.state.loans.create(&other).await.unwrap();
    force_status(&app, foreign.id, LoanStatus::Active).await;

    let stats = app.state.loans.stats_by_borrower(BORROWER).await.unwrap();

    for (bucket, status) in [
        (stats.active, LoanStatus::Active),
        (stats.paid, LoanStatus::Paid),
        (stats.defaulted, LoanStatus::Defaulted),
        (stats.listed, LoanStatus::Listed),
    ] {
        let direct = LoanRequests::find()
            .filter(loan_requests::Column::BorrowerAddress.eq(BORROWER))
            .filter(loan_requests::Column::Status.eq(status))
            .count(&app.db)
            .await
            .unwrap();
        assert_eq!(bucket, direct, "bucket {}", status);
    }
    assert_eq!((stats.active, stats.paid, stats.defaulted, stats.listed), (2, 1, 1, 3));

    let empty = app.state.loans.stats_by_borrower(LENDER_B).await.unwrap();
    assert_eq!((empty.active, empty.paid, empty.defaulted, empty.listed), (0, 0, 0, 0));
}

#[tokio::test]
async fn test_list_by_borrower_with_and_without_vaults() {
    let app = setup_app().await;
    let first = app.state.loans.create(&sample_loan()).await.unwrap();
    let second = app.state.loans.create(&sample_loan()).await.unwrap();
    app.state.loans.approve(first.id).await.unwrap();

    match app.state.loans.list_by_borrower(BORROWER, true).await.unwrap() {
        BorrowerLoans::WithVaults(rows) => {
            assert_eq!(rows.len(), 2);
            // Newest first
            assert_eq!(rows[0].loan_request.id, second.id);
            assert!(rows[0].vault.is_none());
            assert_eq!(rows[1].loan_request.id, first.id);
            assert_eq!(rows[1].vault.as_ref().unwrap().vault_address, fake_vault_address(1));
        }
        other => panic!("expected joined rows, got {:?}", other),
    }

    match app.state.loans.list_by_borrower(BORROWER, false).await.unwrap() {
        BorrowerLoans::Plain(rows) => assert_eq!(rows.len(), 2),
        other => panic!("expected plain rows, got {:?}", other),
    }
}

#[tokio::test]
async fn test_list_by_status() {
    let app = setup_app().await;
    let a = app.state.loans.create(&sample_loan()).await.unwrap();
    let b = app.state.loans.create(&sample_loan()).await.unwrap();
    app.state.loans.change_status(a.id, LoanStatus::Rejected).await.unwrap();

    let requested = app.state.loans.list_by_status(LoanStatus::Requested).await.unwrap();
    assert_eq!(requested.iter().map(|l| l.id).collect::<Vec<_>>(), vec![b.id]);

    let rejected = app.state.loans.list_by_status(LoanStatus::Rejected).await.unwrap();
    assert_eq!(rejected.len(), 1);
}

#[tokio::test]
async fn test_details_totals_and_outstanding_balance() {
    let app = setup_app().await;
    let loan = app.state.loans.create(&sample_loan()).await.unwrap();
    let approval = app.state.loans.approve(loan.id).await.unwrap();
    let vault_address = approval.deployment.vault_address;

    for (n, amount) in [(1, dec!(5000)), (2, dec!(3000))] {
        app.state
            .vaults
            .record_deposit(
                &vault_address,
                &NewDeposit {
                    lender_address: LENDER_A.to_string(),
                    amount,
                    tx_hash: deposit_tx(n),
                },
            )
            .await
            .unwrap();
    }
    app.state
        .vaults
        .record_repayment(
            &vault_address,
            &NewRepayment {
                gross_amount: dec!(1000),
                tx_hash: deposit_tx(10),
            },
        )
        .await
        .unwrap();

    let details = app.state.loans.details(loan.id).await.unwrap();

    assert_eq!(details.vaults.len(), 1);
    assert_eq!(details.vaults[0].lenders.len(), 2);
    assert_eq!(details.vaults[0].repayments.len(), 1);
    assert_eq!(details.total_funded, dec!(8000));
    // Net of the 1% fee
    assert_eq!(details.total_repaid, dec!(990));
    // 8000 x (1 + 0.02 x 60/30)
    assert_eq!(details.accrued_debt, dec!(8320));
    assert_eq!(details.outstanding_balance, dec!(7330));
}

#[tokio::test]
async fn test_details_missing_loan() {
    let app = setup_app().await;
    assert!(matches!(
        app.state.loans.details(7).await.unwrap_err(),
        AppError::NotFound(_)
    ));
}

#[tokio::test]
async fn test_unresolved_intent_blocks_second_deployment() {
    let app = setup_app().await;
    let loan = app.state.loans.create(&sample_loan()).await.unwrap();
    app.gateway.set_behavior(DeployBehavior::Hang);
    app.state.loans.approve(loan.id).await.unwrap_err();

    // Operator rolls the loan back by hand and retries
    force_status(&app, loan.id, LoanStatus::Requested).await;
    app.gateway.set_behavior(DeployBehavior::Succeed);
    let err = app.state.loans.approve(loan.id).await.unwrap_err();
    assert!(matches!(err, AppError::Precondition(_)));

    let pending = VaultDeployments::find()
        .filter(vault_deployments::Column::Status.eq(DeploymentStatus::Pending))
        .count(&app.db)
        .await
        .unwrap();
    assert_eq!(pending, 1);
}

#[tokio::test]
async fn test_vault_cannot_link_to_unapproved_loan() {
    let app = setup_app().await;
    let loan = app.state.loans.create(&sample_loan()).await.unwrap();

    let params = CreateVaultParams {
        invoice_name: "Acme".to_string(),
        invoice_number: "INV-001".to_string(),
        borrower_address: BORROWER.to_string(),
        invoice_amount: dec!(8000),
        maturity_date: 1_767_139_200,
        loan_request_id: Some(loan.id),
    };
    let err = app.state.vaults.create_vault(&params).await.unwrap_err();
    assert!(matches!(err, AppError::Precondition(_)));
    assert_eq!(app.gateway.deploy_count(), 0);

    // Approval is still the way in, and yields exactly one vault
    let result = app.state.loans.approve(loan.id).await.unwrap();
    assert_eq!(result.loan_request.status, LoanStatus::Listed);
    let linked = Vaults::find()
        .filter(vaults::Column::LoanRequestId.eq(loan.id))
        .count(&app.db)
        .await
        .unwrap();
    assert_eq!(linked, 1);
}

#[tokio::test]
async fn test_approve_reverts_when_intent_cannot_be_written() {
    let app = setup_app().await;
    let loan = app.state.loans.create(&sample_loan()).await.unwrap();
    app.db
        .execute_unprepared("DROP TABLE vault_deployments")
        .await
        .unwrap();

    let err = app.state.loans.approve(loan.id).await.unwrap_err();
    assert!(matches!(err, AppError::Storage(_)));
    assert_eq!(app.gateway.deploy_count(), 0);

    let reloaded = app.state.loans.get(loan.id).await.unwrap();
    assert_eq!(reloaded.status, LoanStatus::Requested);
}

#[tokio::test]
async fn test_approve_send_failure_keeps_listed_and_pending_intent() {
    let app = setup_app().await;
    let loan = app.state.loans.create(&sample_loan()).await.unwrap();
    app.gateway.set_behavior(DeployBehavior::Fail(ChainError::Transaction(
        "Send failed: connection reset".into(),
    )));

    let err = app.state.loans.approve(loan.id).await.unwrap_err();
    assert!(matches!(err, AppError::Chain(ChainError::Transaction(_))));

    // The transaction may have reached the mempool: no second approval
    let reloaded = app.state.loans.get(loan.id).await.unwrap();
    assert_eq!(reloaded.status, LoanStatus::Listed);
    let intent = VaultDeployments::find().one(&app.db).await.unwrap().unwrap();
    assert_eq!(intent.status, DeploymentStatus::Pending);

    let err = app.state.loans.approve(loan.id).await.unwrap_err();
    assert!(matches!(err, AppError::Precondition(_)));
    assert_eq!(app.gateway.deploy_count(), 1);
}

#[tokio::test]
async fn test_details_out_of_range_debt_is_an_error() {
    let app = setup_app().await;
    let mut huge = sample_loan();
    huge.max_loan = Decimal::from_scientific("7e28").unwrap();
    huge.monthly_interest_rate = dec!(1);
    huge.term = 30;
    let loan = app.state.loans.create(&huge).await.unwrap();

    let err = app.state.loans.details(loan.id).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}
