//! Catalog endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    error::AppResult,
    models::{
        item::{Item, ItemPage, ItemQuery, UpsertItem, UpsertItemResponse},
        loan::LoanRecord,
    },
    AppState,
};

use super::ValidatedJson;

/// List catalog items, one page at a time
#[utoipa::path(
    get,
    path = "/items",
    tag = "items",
    params(ItemQuery),
    responses(
        (status = 200, description = "One page of items", body = ItemPage),
        (status = 400, description = "Invalid page size", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<ItemQuery>,
) -> AppResult<Json<ItemPage>> {
    let page = state
        .services
        .browser
        .page(query.limit, query.cursor.as_deref())
        .await?;

    Ok(Json(page))
}

/// Add copies of an item, creating it if needed
#[utoipa::path(
    post,
    path = "/items",
    tag = "items",
    request_body = UpsertItem,
    responses(
        (status = 200, description = "Item added/updated", body = UpsertItemResponse),
        (status = 400, description = "Invalid request or copy count out of range", body = crate::error::ErrorResponse)
    )
)]
pub async fn upsert_item(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<UpsertItem>,
) -> AppResult<Json<UpsertItemResponse>> {
    let item = state
        .services
        .catalog
        .upsert(&request.title, &request.author, &request.edition, request.copies)
        .await?;

    Ok(Json(UpsertItemResponse {
        item_id: item.item_id,
        message: "Item added/updated successfully".to_string(),
    }))
}

/// Get item details by ID
#[utoipa::path(
    get,
    path = "/items/{id}",
    tag = "items",
    params(
        ("id" = String, Path, description = "Derived item ID")
    ),
    responses(
        (status = 200, description = "Item details", body = Item),
        (status = 404, description = "Item not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> AppResult<Json<Item>> {
    let item = state.services.catalog.get_item(&item_id).await?;
    Ok(Json(item))
}

/// Ledger entries of an item
#[utoipa::path(
    get,
    path = "/items/{id}/loans",
    tag = "items",
    params(
        ("id" = String, Path, description = "Derived item ID")
    ),
    responses(
        (status = 200, description = "Item's loans, newest first", body = Vec<LoanRecord>),
        (status = 404, description = "Item not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_item_loans(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> AppResult<Json<Vec<LoanRecord>>> {
    let loans = state.services.catalog.loans(&item_id).await?;
    Ok(Json(loans))
}
