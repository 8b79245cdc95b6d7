//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{health, items, loans, members};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lending Registry API",
        version = "0.1.0",
        description = "Members, catalog and loan ledger REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Members
        members::register_member,
        members::get_member,
        members::get_member_loans,
        // Items
        items::list_items,
        items::upsert_item,
        items::get_item,
        items::get_item_loans,
        // Loans
        loans::grant_loan,
    ),
    components(
        schemas(
            // Members
            crate::models::member::Member,
            crate::models::member::RegisterMember,
            crate::models::member::RegisteredMember,
            // Items
            crate::models::item::Item,
            crate::models::item::ItemPage,
            crate::models::item::UpsertItem,
            crate::models::item::UpsertItemResponse,
            // Loans
            crate::models::loan::LoanRecord,
            crate::models::loan::LoanStatus,
            crate::models::loan::GrantLoan,
            crate::models::loan::LoanResponse,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "members", description = "Member registry"),
        (name = "items", description = "Catalog"),
        (name = "loans", description = "Loan grants")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
