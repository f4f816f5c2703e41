//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{health, lendings, stats};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Circulation API",
        version = "1.0.0",
        description = "Library circulation REST API for the school-management platform",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Lendings
        lendings::list_lendings,
        lendings::get_lending,
        lendings::create_lending,
        lendings::return_item,
        lendings::renew_lending,
        lendings::add_fine,
        lendings::pay_fine,
        lendings::get_lending_activity,
        lendings::get_borrower_lendings,
        // Stats
        stats::get_lending_stats,
        stats::get_activity_stats,
    ),
    components(
        schemas(
            // Lendings
            crate::models::lending::LendingDetails,
            crate::models::lending::LendingItem,
            crate::models::lending::Renewal,
            crate::models::lending::Fine,
            crate::models::lending::NewLending,
            crate::models::lending::NewLendingItem,
            crate::models::lending::ReturnItem,
            crate::models::lending::RenewLending,
            crate::models::lending::AddFine,
            crate::models::lending::LendingQuery,
            crate::models::enums::LendingStatus,
            crate::models::enums::ItemCondition,
            crate::models::enums::FineReason,
            crate::models::enums::ActivityAction,
            crate::models::activity::ActivityEntry,
            crate::models::activity::ActivityStatsQuery,
            crate::models::activity::Interval,
            lendings::LendingsListResponse,
            // Stats
            stats::StatEntry,
            stats::LendingStatsResponse,
            stats::TimeSeriesEntry,
            stats::ActivityStatsResponse,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "lendings", description = "Lending lifecycle"),
        (name = "stats", description = "Statistics")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
