//! Per-execution context construction.

use std::sync::Arc;

use serde_json::Value;

use flowdeck_pieces::{
    ActionContext, ConnectionManager, ConnectionTarget, ContextStore, FilesService, FlowsContext,
    ProjectContext, RunControl,
};
use flowdeck_types::InputBag;

use crate::services::EngineServices;

/// Per-execution inputs to the context builder.
#[derive(Debug, Clone)]
pub struct ContextParams {
    /// Name of the executing step.
    pub step_name: String,
    /// Flow the execution is attributed to (a sentinel in direct mode).
    pub flow_id: String,
    /// Opaque run id for logging.
    pub run_id: String,
    /// Project scope.
    pub project: ProjectContext,
    /// Validated, coerced input.
    pub props_value: InputBag,
    /// Resolved credential value, if any.
    pub auth: Option<Value>,
}

/// Builds one fresh [`ActionContext`] per execution attempt.
///
/// The builder itself is cheap and shareable; every `build` call
/// constructs new capability objects so that no capability instance ever
/// outlives a single execution.
#[derive(Clone)]
pub struct ContextBuilder {
    services: Arc<EngineServices>,
}

impl ContextBuilder {
    /// Create a builder over the given services.
    pub fn new(services: Arc<EngineServices>) -> Self {
        Self { services }
    }

    /// Construct the capability surface for one execution.
    pub fn build(&self, params: ContextParams) -> ActionContext {
        let svc = &self.services;

        ActionContext {
            store: ContextStore::new(
                svc.kv.clone(),
                svc.store_prefix.clone(),
                params.project.id.clone(),
                params.flow_id.clone(),
                params.run_id.clone(),
            ),
            files: FilesService::new(
                svc.files.clone(),
                params.flow_id.clone(),
                params.step_name.clone(),
            ),
            flows: FlowsContext::new(svc.flows.clone(), params.flow_id.clone()),
            connections: ConnectionManager::new(
                svc.connections.clone(),
                params.project.id.clone(),
                ConnectionTarget::Actions,
            ),
            agent: svc.agent_tools.clone(),
            run: RunControl::detached(params.run_id.clone()),
            run_id: params.run_id,
            step_name: params.step_name,
            props_value: params.props_value,
            auth: params.auth,
            project: params.project,
        }
    }
}
