//! Member endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::{
        loan::LoanRecord,
        member::{Member, RegisterMember, RegisteredMember},
    },
    AppState,
};

use super::ValidatedJson;

/// Register a new member
#[utoipa::path(
    post,
    path = "/members",
    tag = "members",
    request_body = RegisterMember,
    responses(
        (status = 201, description = "Member registered", body = RegisteredMember),
        (status = 400, description = "Invalid member id format", body = crate::error::ErrorResponse),
        (status = 409, description = "Member already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn register_member(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RegisterMember>,
) -> AppResult<(StatusCode, Json<RegisteredMember>)> {
    let member = state.services.members.register(&request.member_id).await?;

    Ok((StatusCode::CREATED, Json(member.into())))
}

/// Get member by ID
#[utoipa::path(
    get,
    path = "/members/{id}",
    tag = "members",
    params(
        ("id" = String, Path, description = "Member ID (mobile number)")
    ),
    responses(
        (status = 200, description = "Member details", body = Member),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_member(
    State(state): State<AppState>,
    Path(member_id): Path<String>,
) -> AppResult<Json<Member>> {
    let member = state.services.members.get(&member_id).await?;
    Ok(Json(member))
}

/// Ledger entries of a member
#[utoipa::path(
    get,
    path = "/members/{id}/loans",
    tag = "members",
    params(
        ("id" = String, Path, description = "Member ID (mobile number)")
    ),
    responses(
        (status = 200, description = "Member's loans, newest first", body = Vec<LoanRecord>),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_member_loans(
    State(state): State<AppState>,
    Path(member_id): Path<String>,
) -> AppResult<Json<Vec<LoanRecord>>> {
    let loans = state.services.members.loans(&member_id).await?;
    Ok(Json(loans))
}
