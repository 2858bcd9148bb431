//! Piece execution endpoint.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use flowdeck_types::{ExecuteActionResponse, InputBag};

use crate::error::Result;
use crate::service::{ExecutePieceActionParams, PieceExecuteService};
use crate::state::AppState;

/// Request body for executing a piece action directly.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExecutePieceActionRequest {
    /// The version of the piece.
    pub piece_version: String,
    /// Input values for the action's declared props.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub input: Option<InputBag>,
    /// The connection to authenticate with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
    /// Project override; defaults to the configured project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

/// Execute a piece action directly, without a flow.
///
/// Always answers 200 with `success: false` for data-level failures;
/// only stale references (unknown piece, missing or undecryptable
/// connection) use an error status.
#[utoipa::path(
    post,
    path = "/v1/pieces/{piece_name}/actions/{action_name}/execute",
    params(
        ("piece_name" = String, Path, description = "The name of the piece"),
        ("action_name" = String, Path, description = "The action to execute"),
    ),
    responses(
        (status = 200, description = "Execution verdict"),
        (status = 404, description = "Piece or connection not found"),
        (status = 400, description = "Connection could not be decrypted"),
    ),
    tag = "pieces"
)]
pub async fn execute_action_handler(
    State(state): State<AppState>,
    Path((piece_name, action_name)): Path<(String, String)>,
    Json(body): Json<ExecutePieceActionRequest>,
) -> Result<Json<ExecuteActionResponse>> {
    let project_id = body
        .project_id
        .unwrap_or_else(|| state.config.default_project_id.clone());

    let response = PieceExecuteService::new(&state)
        .execute(ExecutePieceActionParams {
            piece_name,
            action_name,
            piece_version: body.piece_version,
            input: body.input.unwrap_or_default(),
            connection_id: body.connection_id,
            project_id,
            platform_id: state.config.platform_id.clone(),
        })
        .await?;

    Ok(Json(response))
}

/// Create piece execution routes.
pub fn piece_routes() -> Router<AppState> {
    Router::new().route(
        "/v1/pieces/{piece_name}/actions/{action_name}/execute",
        post(execute_action_handler),
    )
}
