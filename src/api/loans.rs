//! Loan endpoints

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    error::AppResult,
    models::loan::{GrantLoan, LoanResponse},
    AppState,
};

use super::ValidatedJson;

/// Borrow one copy of an item
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = GrantLoan,
    responses(
        (status = 201, description = "Loan granted", body = LoanResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 409, description = "Item unavailable, member limit reached, or member unknown", body = crate::error::ErrorResponse),
        (status = 503, description = "Store unavailable, safe to retry", body = crate::error::ErrorResponse),
        (status = 500, description = "Store rejected the write", body = crate::error::ErrorResponse)
    )
)]
pub async fn grant_loan(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<GrantLoan>,
) -> AppResult<(StatusCode, Json<LoanResponse>)> {
    let record = state
        .services
        .loans
        .grant_loan(&request.member_id, &request.item_id)
        .await?;

    Ok((StatusCode::CREATED, Json(record.into())))
}
