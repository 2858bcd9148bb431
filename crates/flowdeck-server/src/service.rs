//! The orchestrating service behind the execute endpoint.
//!
//! Resolves the piece and the optional connection, merges the decrypted
//! credential into the input under the reserved key, and dispatches the
//! execution either in process or through the job broker. Everything
//! except a stale reference comes back as a data-level
//! [`ExecuteActionResponse`]; see the error taxonomy in
//! [`crate::error`].

use serde_json::Value;
use tracing::{debug, error};

use flowdeck_broker::{BrokerError, JobSubmission};
use flowdeck_engine::{ExecutePieceActionOperation, execute_piece_action};
use flowdeck_types::{
    AUTHENTICATION_PROPERTY_NAME, EngineResponseStatus, ExecuteActionResponse, InputBag,
    PlatformError, WorkerJobType,
};

use crate::config::ExecutionMode;
use crate::error::Result;
use crate::state::AppState;

/// Parameters of one execute request, resolved at the HTTP boundary.
#[derive(Debug, Clone)]
pub struct ExecutePieceActionParams {
    /// Piece to execute.
    pub piece_name: String,
    /// Action within the piece.
    pub action_name: String,
    /// Piece version.
    pub piece_version: String,
    /// Raw caller input.
    pub input: InputBag,
    /// Optional stored connection to authenticate with.
    pub connection_id: Option<String>,
    /// Project the request runs under.
    pub project_id: String,
    /// Platform the request runs under.
    pub platform_id: String,
}

/// The façade used by the HTTP boundary.
pub struct PieceExecuteService<'a> {
    state: &'a AppState,
}

impl<'a> PieceExecuteService<'a> {
    /// Create the service over the shared state.
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Execute one piece action to a data-level verdict.
    ///
    /// `Err` is reserved for protocol-level conditions: an unknown piece
    /// or a missing/undecryptable connection.
    pub async fn execute(&self, params: ExecutePieceActionParams) -> Result<ExecuteActionResponse> {
        let piece = self
            .state
            .registry
            .get(&params.piece_name, &params.piece_version, &params.platform_id)
            .await
            .ok_or_else(|| PlatformError::PieceNotFound {
                name: params.piece_name.clone(),
                version: params.piece_version.clone(),
            })?;

        // An unknown action is recoverable by the caller fixing the name,
        // so it stays a data-level failure.
        if !piece.actions.contains_key(&params.action_name) {
            return Ok(ExecuteActionResponse::failure(
                params.input,
                format!(
                    "Action '{}' not found in piece '{}'",
                    params.action_name, params.piece_name
                ),
            ));
        }

        let mut resolved_input = params.input.clone();
        if let Some(connection_id) = &params.connection_id {
            let value = self.resolve_connection(connection_id, &params).await?;
            resolved_input.insert(AUTHENTICATION_PROPERTY_NAME.to_string(), value);
        }

        match self.state.config.execution_mode {
            ExecutionMode::Local => Ok(self.execute_locally(&params, resolved_input).await),
            ExecutionMode::Worker => Ok(self.execute_via_broker(&params, resolved_input).await),
        }
    }

    async fn resolve_connection(
        &self,
        connection_id: &str,
        params: &ExecutePieceActionParams,
    ) -> Result<Value> {
        let connection = self
            .state
            .connections
            .find(connection_id, &params.project_id, &params.platform_id)
            .await
            .ok_or_else(|| PlatformError::entity_not_found("AppConnection", connection_id))?;

        // At most once per attempt: a refresh may persist a new token.
        let value = self
            .state
            .connections
            .decrypt_and_refresh(&connection, &params.project_id)
            .await?;

        debug!(connection_id, "resolved connection credential");
        Ok(value)
    }

    async fn execute_locally(
        &self,
        params: &ExecutePieceActionParams,
        resolved_input: InputBag,
    ) -> ExecuteActionResponse {
        let response = execute_piece_action(
            self.state.registry.as_ref(),
            &self.state.engine_services,
            ExecutePieceActionOperation {
                platform_id: params.platform_id.clone(),
                project_id: params.project_id.clone(),
                external_project_id: None,
                piece_name: params.piece_name.clone(),
                piece_version: params.piece_version.clone(),
                action_name: params.action_name.clone(),
                input: resolved_input,
            },
        )
        .await;

        if response.status != EngineResponseStatus::Ok {
            return ExecuteActionResponse::failure(
                params.input.clone(),
                format!("Engine returned status: {}", response.status),
            );
        }
        response.response
    }

    async fn execute_via_broker(
        &self,
        params: &ExecutePieceActionParams,
        resolved_input: InputBag,
    ) -> ExecuteActionResponse {
        let Some(broker) = &self.state.broker else {
            error!("worker mode configured without a broker");
            return ExecuteActionResponse::failure(
                params.input.clone(),
                "no worker broker configured".to_string(),
            );
        };

        let submitted = broker
            .submit_and_wait(JobSubmission {
                job_type: WorkerJobType::ExecutePieceAction,
                platform_id: params.platform_id.clone(),
                project_id: params.project_id.clone(),
                piece_name: params.piece_name.clone(),
                piece_version: params.piece_version.clone(),
                action_name: params.action_name.clone(),
                input: resolved_input,
            })
            .await;

        match submitted {
            Ok(response) if response.status == EngineResponseStatus::Ok => response.response,
            Ok(response) => ExecuteActionResponse::failure(
                params.input.clone(),
                format!("Engine returned status: {}", response.status),
            ),
            Err(BrokerError::Timeout(_)) => ExecuteActionResponse::failure(
                params.input.clone(),
                format!("Engine returned status: {}", EngineResponseStatus::Timeout),
            ),
            Err(e) => {
                error!(error = %e, piece = %params.piece_name, "failed to execute piece action");
                ExecuteActionResponse::failure(params.input.clone(), e.to_string())
            }
        }
    }
}
