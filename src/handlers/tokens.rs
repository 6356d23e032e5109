//! Invoice token endpoints

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::error::AppError;
use crate::models::response::ApiResponse;
use crate::models::token::{BalanceQuery, FaucetBody, FaucetResult, TokenBalance};
use crate::services::sanitize::sanitize_address;
use crate::services::validation::validate_address;
use crate::AppState;

/// GET /tokens/{address}/balance?spender=0x...
pub async fn get_balance(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(query): Query<BalanceQuery>,
) -> Result<(StatusCode, Json<ApiResponse<TokenBalance>>), AppError> {
    let address = sanitize_address(&address);
    validate_address("address", &address).map_err(AppError::Validation)?;

    let spender = match query.spender.as_deref() {
        Some(raw) => {
            let spender = sanitize_address(raw);
            validate_address("spender", &spender).map_err(AppError::Validation)?;
            Some(spender)
        }
        None => None,
    };

    let balance = state.tokens.balance(&address, spender.as_deref()).await?;
    Ok((StatusCode::OK, Json(ApiResponse::new("Token balance retrieved", balance))))
}

/// POST /tokens/faucet
pub async fn faucet(
    State(state): State<AppState>,
    payload: Result<Json<FaucetBody>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<FaucetResult>>), AppError> {
    let Json(body) = payload?;
    let request = body.into_request().map_err(AppError::Validation)?;

    let correlation_id = uuid::Uuid::new_v4().to_string();
    info!(correlation_id = %correlation_id, to = %request.address, amount = %request.amount, "Faucet mint requested");

    let result = state.tokens.faucet(&request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::new("Test tokens minted", result))))
}
