//! Vault endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::entities::{vault_lenders, vault_repayments, vaults};
use crate::error::AppError;
use crate::models::response::ApiResponse;
use crate::models::vault::{
    AttachVaultBody, CreateVaultBody, DepositBody, DepositResult, DeployResult, ReconcileReport,
    RepaymentBody, RepaymentResult, UpdateVaultStatusBody,
};
use crate::services::sanitize::sanitize_address;
use crate::services::validation::validate_address;
use crate::AppState;

type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), AppError>;

fn vault_address(raw: &str) -> Result<String, AppError> {
    let address = sanitize_address(raw);
    validate_address("vault_address", &address).map_err(AppError::Validation)?;
    Ok(address)
}

/// POST /vaults
pub async fn create_vault(
    State(state): State<AppState>,
    payload: Result<Json<CreateVaultBody>, JsonRejection>,
) -> ApiResult<DeployResult> {
    let Json(body) = payload?;
    let params = body.into_params().map_err(AppError::Validation)?;

    let correlation_id = uuid::Uuid::new_v4().to_string();
    info!(
        correlation_id = %correlation_id,
        name = %params.vault_name(),
        borrower = %params.borrower_address,
        "Vault deployment requested"
    );

    let result = state.vaults.create_vault(&params).await?;

    info!(correlation_id = %correlation_id, vault_address = %result.vault_address, "Vault deployment completed");
    Ok((StatusCode::CREATED, Json(ApiResponse::new("Vault deployed", result))))
}

/// GET /vaults
pub async fn list_vaults(State(state): State<AppState>) -> ApiResult<Vec<vaults::Model>> {
    let vaults = state.vaults.get_all_vaults().await?;
    Ok((StatusCode::OK, Json(ApiResponse::new("Vaults retrieved", vaults))))
}

/// GET /vaults/{address}
pub async fn get_vault(State(state): State<AppState>, Path(address): Path<String>) -> ApiResult<vaults::Model> {
    let address = vault_address(&address)?;
    let vault = state.vaults.get_vault(&address).await?;
    Ok((StatusCode::OK, Json(ApiResponse::new("Vault retrieved", vault))))
}

/// GET /vaults/{address}/lenders
pub async fn list_vault_lenders(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<Vec<vault_lenders::Model>> {
    let address = vault_address(&address)?;
    let lenders = state.vaults.get_vault_lenders(&address).await?;
    Ok((StatusCode::OK, Json(ApiResponse::new("Vault lenders retrieved", lenders))))
}

/// POST /vaults/{address}/deposits
pub async fn record_deposit(
    State(state): State<AppState>,
    Path(address): Path<String>,
    payload: Result<Json<DepositBody>, JsonRejection>,
) -> ApiResult<DepositResult> {
    let address = vault_address(&address)?;
    let Json(body) = payload?;
    let deposit = body.into_deposit().map_err(AppError::Validation)?;

    let result = state.vaults.record_deposit(&address, &deposit).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new("Deposit recorded", result))))
}

/// GET /vaults/{address}/repayments
pub async fn list_vault_repayments(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<Vec<vault_repayments::Model>> {
    let address = vault_address(&address)?;
    let repayments = state.vaults.get_vault_repayments(&address).await?;
    Ok((StatusCode::OK, Json(ApiResponse::new("Vault repayments retrieved", repayments))))
}

/// POST /vaults/{address}/repayments
pub async fn record_repayment(
    State(state): State<AppState>,
    Path(address): Path<String>,
    payload: Result<Json<RepaymentBody>, JsonRejection>,
) -> ApiResult<RepaymentResult> {
    let address = vault_address(&address)?;
    let Json(body) = payload?;
    let repayment = body.into_repayment().map_err(AppError::Validation)?;

    let result = state.vaults.record_repayment(&address, &repayment).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new("Repayment recorded", result))))
}

/// PATCH /vaults/{address}/status
pub async fn update_vault_status(
    State(state): State<AppState>,
    Path(address): Path<String>,
    payload: Result<Json<UpdateVaultStatusBody>, JsonRejection>,
) -> ApiResult<vaults::Model> {
    let address = vault_address(&address)?;
    let Json(body) = payload?;
    let update = body.into_update().map_err(AppError::Validation)?;

    let vault = state.vaults.update_vault_status(&address, &update).await?;
    Ok((StatusCode::OK, Json(ApiResponse::new("Vault status updated", vault))))
}

/// POST /vaults/attach
pub async fn attach_vault(
    State(state): State<AppState>,
    payload: Result<Json<AttachVaultBody>, JsonRejection>,
) -> ApiResult<vaults::Model> {
    let Json(body) = payload?;
    let attach = body.into_attach().map_err(AppError::Validation)?;

    let vault = state.vaults.attach_vault(&attach).await?;
    Ok((StatusCode::OK, Json(ApiResponse::new("Vault attached", vault))))
}

/// POST /vaults/reconcile
pub async fn reconcile_deployments(State(state): State<AppState>) -> ApiResult<ReconcileReport> {
    let report = state.vaults.reconcile_deployments().await?;
    Ok((StatusCode::OK, Json(ApiResponse::new("Deployments reconciled", report))))
}
