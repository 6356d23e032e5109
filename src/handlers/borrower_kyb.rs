//! Borrower KYB endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};

use crate::entities::borrower_kyb;
use crate::error::AppError;
use crate::models::kyb::{CreateKybBody, KybCheck};
use crate::models::response::ApiResponse;
use crate::services::sanitize::sanitize_address;
use crate::services::validation::validate_address;
use crate::AppState;

/// POST /borrower-kyb
pub async fn create_kyb(
    State(state): State<AppState>,
    payload: Result<Json<CreateKybBody>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<borrower_kyb::Model>>), AppError> {
    let Json(body) = payload?;
    let kyb = body.into_new_kyb().map_err(AppError::Validation)?;

    let record = state.kyb.create(&kyb).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new("KYB submitted", record))))
}

/// GET /borrower-kyb/check/{walletAddress}
pub async fn check_kyb(
    State(state): State<AppState>,
    Path(wallet_address): Path<String>,
) -> Result<(StatusCode, Json<ApiResponse<KybCheck>>), AppError> {
    let wallet_address = sanitize_address(&wallet_address);
    validate_address("wallet_address", &wallet_address).map_err(AppError::Validation)?;

    let has_kyb = state.kyb.has_kyb(&wallet_address).await?;
    Ok((
        StatusCode::OK,
        Json(ApiResponse::new(
            "KYB status retrieved",
            KybCheck {
                wallet_address,
                has_kyb,
            },
        )),
    ))
}
