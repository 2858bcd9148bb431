//! The piece-action operation: one action, start to verdict.
//!
//! This is the unit of work a worker performs for an
//! `EXECUTE_PIECE_ACTION` job, and what a local-mode host runs in
//! process. Resolution misses, validation errors, and action faults all
//! come back as data-level failures inside an `Ok` engine response — the
//! transport status only goes non-`Ok` when the engine itself cannot
//! produce a verdict.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use flowdeck_pieces::{
    PieceRegistry, ProcessorOptions, ProjectContext, apply_processors_and_validators,
    resolve_action,
};
use flowdeck_types::{
    AUTHENTICATION_PROPERTY_NAME, DIRECT_EXECUTION_FLOW_ID, EngineResponse, ExecuteActionResponse,
    InputBag, WorkerJob,
};

use crate::compat::adapt_for_version;
use crate::context_builder::{ContextBuilder, ContextParams};
use crate::runner::run_action;
use crate::services::EngineServices;

/// Parameters of a single piece-action execution.
#[derive(Debug, Clone)]
pub struct ExecutePieceActionOperation {
    /// Platform the request is scoped to.
    pub platform_id: String,
    /// Project the request is scoped to.
    pub project_id: String,
    /// Externally-visible project id, when the platform maps one.
    pub external_project_id: Option<String>,
    /// Piece to resolve.
    pub piece_name: String,
    /// Piece version to resolve.
    pub piece_version: String,
    /// Action within the piece.
    pub action_name: String,
    /// Raw caller input, credential already merged under the reserved key.
    pub input: InputBag,
}

impl From<&WorkerJob> for ExecutePieceActionOperation {
    fn from(job: &WorkerJob) -> Self {
        Self {
            platform_id: job.platform_id.clone(),
            project_id: job.project_id.clone(),
            external_project_id: None,
            piece_name: job.piece_name.clone(),
            piece_version: job.piece_version.clone(),
            action_name: job.action_name.clone(),
            input: job.input.clone(),
        }
    }
}

/// Execute one piece action to a verdict.
pub async fn execute_piece_action(
    registry: &dyn PieceRegistry,
    services: &Arc<EngineServices>,
    operation: ExecutePieceActionOperation,
) -> EngineResponse<ExecuteActionResponse> {
    let input_echo = operation.input.clone();

    let resolved = resolve_action(
        registry,
        &operation.piece_name,
        &operation.piece_version,
        &operation.platform_id,
        &operation.action_name,
    )
    .await;

    let (piece, action) = match resolved {
        Ok(pair) => pair,
        Err(e) => {
            debug!(error = %e, "piece resolution failed");
            return EngineResponse::ok(ExecuteActionResponse::failure(input_echo, e.to_string()));
        }
    };

    let processed = apply_processors_and_validators(
        &operation.input,
        &action.props,
        piece.auth.as_ref(),
        action.require_auth,
        &ProcessorOptions::default(),
    );

    if !processed.is_valid() {
        let errors = serde_json::to_string(&processed.errors).unwrap_or_default();
        return EngineResponse::ok(ExecuteActionResponse::failure(
            input_echo,
            format!("Validation errors: {errors}"),
        ));
    }

    let auth = processed.processed_input.get(AUTHENTICATION_PROPERTY_NAME).cloned();

    let context = ContextBuilder::new(services.clone()).build(ContextParams {
        step_name: operation.action_name.clone(),
        flow_id: DIRECT_EXECUTION_FLOW_ID.to_string(),
        run_id: Uuid::new_v4().to_string(),
        project: ProjectContext {
            id: operation.project_id.clone(),
            external_id: operation.external_project_id.clone(),
        },
        props_value: processed.processed_input,
        auth,
    });

    let context = adapt_for_version(context, piece.context_version);
    let outcome = run_action(action, context).await;

    EngineResponse::ok(ExecuteActionResponse::from_outcome(input_echo, outcome))
}
