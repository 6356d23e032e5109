// src/lib.rs

use axum::{
    routing::{get, patch, post},
    Json, Router,
};
use sea_orm::DatabaseConnection;
use serde_json::json;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use config::ChainConfig;
use services::{
    borrower_kyb::BorrowerKybService, chain_gateway::ChainGateway,
    loan_lifecycle::LoanLifecycleService, loan_request_store::LoanRequestStore,
    token_service::TokenService, vault_ledger::{LedgerSettings, VaultLedgerService},
};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub loans: LoanLifecycleService,
    pub vaults: VaultLedgerService,
    pub kyb: BorrowerKybService,
    pub tokens: TokenService,
}

impl AppState {
    /// Wire every service onto one connection pool and one chain gateway
    pub fn new(db: DatabaseConnection, gateway: Arc<dyn ChainGateway>, chain: &ChainConfig) -> Self {
        let settings = LedgerSettings::from(chain);
        let vaults = VaultLedgerService::new(db.clone(), gateway.clone(), settings.clone());
        let loans = LoanLifecycleService::new(LoanRequestStore::new(db.clone()), vaults.clone());

        Self {
            kyb: BorrowerKybService::new(db.clone()),
            tokens: TokenService::new(gateway, settings),
            db,
            loans,
            vaults,
        }
    }
}

pub mod config;
pub mod error;

pub mod entities {
    pub mod prelude;
    pub mod borrower_kyb;
    pub mod loan_requests;
    pub mod vault_deployments;
    pub mod vault_lenders;
    pub mod vault_repayments;
    pub mod vaults;
}

pub mod services {
    pub mod amounts;
    pub mod borrower_kyb;
    pub mod chain_gateway;
    pub mod loan_lifecycle;
    pub mod loan_request_store;
    pub mod sanitize;
    pub mod token_service;
    pub mod validation;
    pub mod vault_ledger;
}

pub mod models {
    pub mod kyb;
    pub mod loan_request;
    pub mod response;
    pub mod token;
    pub mod vault;
}

pub mod handlers {
    pub mod borrower_kyb;
    pub mod loan_requests;
    pub mod tokens;
    pub mod vaults;
}

/// Build the HTTP router
pub fn build_router(state: AppState) -> Router {
    use handlers::{borrower_kyb, loan_requests, tokens, vaults};

    Router::new()
        .route("/health", get(health))
        // Loan requests
        .route(
            "/loan-requests",
            post(loan_requests::create_loan_request).get(loan_requests::list_loan_requests),
        )
        .route("/loan-requests/{id}", get(loan_requests::get_loan_request))
        .route("/loan-requests/{id}/details", get(loan_requests::get_loan_request_details))
        .route("/loan-requests/{id}/approve", post(loan_requests::approve_loan_request))
        .route("/loan-requests/{id}/status", patch(loan_requests::update_loan_status))
        .route(
            "/loan-requests/borrower/{address}",
            get(loan_requests::list_borrower_loan_requests),
        )
        .route("/loan-requests/borrower/{address}/stats", get(loan_requests::get_borrower_stats))
        // Vaults
        .route("/vaults", post(vaults::create_vault).get(vaults::list_vaults))
        .route("/vaults/attach", post(vaults::attach_vault))
        .route("/vaults/reconcile", post(vaults::reconcile_deployments))
        .route("/vaults/{address}", get(vaults::get_vault))
        .route("/vaults/{address}/lenders", get(vaults::list_vault_lenders))
        .route("/vaults/{address}/deposits", post(vaults::record_deposit))
        .route(
            "/vaults/{address}/repayments",
            get(vaults::list_vault_repayments).post(vaults::record_repayment),
        )
        .route("/vaults/{address}/status", patch(vaults::update_vault_status))
        // KYB
        .route("/borrower-kyb", post(borrower_kyb::create_kyb))
        .route("/borrower-kyb/check/{wallet_address}", get(borrower_kyb::check_kyb))
        // Invoice token
        .route("/tokens/faucet", post(tokens::faucet))
        .route("/tokens/{address}/balance", get(tokens::get_balance))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
