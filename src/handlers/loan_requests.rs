//! Loan request endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::entities::loan_requests;
use crate::error::AppError;
use crate::models::loan_request::{
    BorrowerLoans, BorrowerLoansQuery, CreateLoanRequestBody, ListByStatusQuery, LoanRequestDetails,
    LoanStats, UpdateStatusBody,
};
use crate::models::response::ApiResponse;
use crate::services::loan_lifecycle::ApprovalResult;
use crate::services::sanitize::{self, limits, sanitize_address};
use crate::services::validation::{validate_address, validate_id, validate_status};
use crate::AppState;

type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), AppError>;

fn ok<T>(message: &str, data: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(ApiResponse::new(message, data))))
}

fn path_id(raw: &str) -> Result<i32, AppError> {
    validate_id("id", raw).map_err(AppError::Validation)
}

fn path_address(raw: &str) -> Result<String, AppError> {
    let address = sanitize_address(raw);
    validate_address("address", &address).map_err(AppError::Validation)?;
    Ok(address)
}

/// POST /loan-requests
pub async fn create_loan_request(
    State(state): State<AppState>,
    payload: Result<Json<CreateLoanRequestBody>, JsonRejection>,
) -> ApiResult<loan_requests::Model> {
    let Json(body) = payload?;
    let new = body.sanitize().validate().map_err(AppError::Validation)?;

    let loan = state.loans.create(&new).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new("Loan request created", loan)),
    ))
}

/// GET /loan-requests/{id}
pub async fn get_loan_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<loan_requests::Model> {
    let id = path_id(&id)?;
    ok("Loan request retrieved", state.loans.get(id).await?)
}

/// GET /loan-requests/{id}/details
pub async fn get_loan_request_details(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<LoanRequestDetails> {
    let id = path_id(&id)?;
    ok("Loan request details retrieved", state.loans.details(id).await?)
}

/// GET /loan-requests?status=X
pub async fn list_loan_requests(
    State(state): State<AppState>,
    Query(query): Query<ListByStatusQuery>,
) -> ApiResult<Vec<loan_requests::Model>> {
    let raw = query
        .status
        .as_deref()
        .map(|s| sanitize::sanitize_text(s, limits::STATUS))
        .unwrap_or_default();
    let status = validate_status(&raw).map_err(AppError::Validation)?;

    ok("Loan requests retrieved", state.loans.list_by_status(status).await?)
}

/// GET /loan-requests/borrower/{address}?include=vaults
pub async fn list_borrower_loan_requests(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(query): Query<BorrowerLoansQuery>,
) -> ApiResult<BorrowerLoans> {
    let address = path_address(&address)?;
    let loans = state
        .loans
        .list_by_borrower(&address, query.include_vaults())
        .await?;
    ok("Borrower loan requests retrieved", loans)
}

/// GET /loan-requests/borrower/{address}/stats
pub async fn get_borrower_stats(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> ApiResult<LoanStats> {
    let address = path_address(&address)?;
    ok("Borrower stats retrieved", state.loans.stats_by_borrower(&address).await?)
}

/// POST /loan-requests/{id}/approve
pub async fn approve_loan_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ApprovalResult> {
    let id = path_id(&id)?;
    let correlation_id = uuid::Uuid::new_v4().to_string();
    info!(correlation_id = %correlation_id, loan_request_id = id, "Loan approval requested");

    let result = state.loans.approve(id).await?;

    info!(
        correlation_id = %correlation_id,
        loan_request_id = id,
        vault_address = %result.deployment.vault_address,
        "Loan approval completed"
    );
    ok("Loan request approved and vault deployed", result)
}

/// PATCH /loan-requests/{id}/status
pub async fn update_loan_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStatusBody>, JsonRejection>,
) -> ApiResult<loan_requests::Model> {
    let id = path_id(&id)?;
    let Json(body) = payload?;
    let raw = sanitize::text_value(&body.status, limits::STATUS);
    let status = validate_status(&raw).map_err(AppError::Validation)?;

    ok("Loan status updated", state.loans.change_status(id, status).await?)
}
