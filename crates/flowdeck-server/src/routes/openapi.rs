//! OpenAPI documentation configuration.

use axum::{Json, Router, routing::get};
use utoipa::OpenApi;

use super::{health, pieces};
use crate::state::AppState;

/// OpenAPI documentation for the Flowdeck API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Flowdeck API",
        description = "HTTP API for executing piece actions",
        license(name = "MIT"),
    ),
    servers(
        (url = "/", description = "Local server"),
    ),
    paths(
        // Health
        health::health,
        // Pieces
        pieces::execute_action_handler,
    ),
    components(
        schemas(
            // Health
            health::HealthResponse,
            // Pieces
            pieces::ExecutePieceActionRequest,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "pieces", description = "Piece action execution"),
    )
)]
pub struct ApiDoc;

/// Serve the OpenAPI document.
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Create the OpenAPI document route.
pub fn openapi_routes() -> Router<AppState> {
    Router::new().route("/api/openapi.json", get(openapi_json))
}
