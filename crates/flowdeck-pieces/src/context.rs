//! The execution context handed to a running action.
//!
//! An [`ActionContext`] is the fixed capability surface a piece action
//! sees: scoped key/value storage, file staging, sub-flow invocation,
//! access to other stored connections, agent tooling, and run lifecycle
//! control. Every capability object is freshly constructed for a single
//! execution and must not outlive it — nothing here is a shared
//! singleton, so unrelated actions in the same process cannot observe
//! each other's state.
//!
//! The capability objects are concrete wrappers; the host supplies their
//! backends through the traits defined here ([`KvStore`], [`FileStore`],
//! [`FlowService`], [`ConnectionService`], [`AgentToolProvider`]).

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Error raised by a capability backend.
#[derive(Debug, Clone, Error)]
pub enum CapabilityError {
    /// The backend could not serve the request.
    #[error("capability backend error: {0}")]
    Backend(String),

    /// The requested entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The capability is not available in this execution mode.
    #[error("capability unavailable: {0}")]
    Unavailable(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Key/value storage
// ─────────────────────────────────────────────────────────────────────────────

/// Namespace a stored key is scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreScope {
    /// Shared across all flows of the project.
    Project,
    /// Shared across runs of the current flow.
    #[default]
    Flow,
    /// Private to the current run.
    Run,
}

/// Backend for scoped key/value storage.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Store a value under a fully-namespaced key.
    async fn put(&self, key: &str, value: Value) -> Result<(), CapabilityError>;
    /// Fetch a value by fully-namespaced key.
    async fn get(&self, key: &str) -> Result<Option<Value>, CapabilityError>;
    /// Remove a key; removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), CapabilityError>;
}

/// Scoped key/value storage exposed to an action.
///
/// Keys are namespaced by an installation prefix plus the identifiers of
/// the current execution, so two actions can only collide when they share
/// the scope on purpose.
pub struct ContextStore {
    backend: Arc<dyn KvStore>,
    prefix: String,
    project_id: String,
    flow_id: String,
    run_id: String,
}

impl ContextStore {
    /// Create a store view for one execution.
    pub fn new(
        backend: Arc<dyn KvStore>,
        prefix: impl Into<String>,
        project_id: impl Into<String>,
        flow_id: impl Into<String>,
        run_id: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            prefix: prefix.into(),
            project_id: project_id.into(),
            flow_id: flow_id.into(),
            run_id: run_id.into(),
        }
    }

    fn namespaced(&self, scope: StoreScope, key: &str) -> String {
        match scope {
            StoreScope::Project => format!("{}project_{}/{key}", self.prefix, self.project_id),
            StoreScope::Flow => format!("{}flow_{}/{key}", self.prefix, self.flow_id),
            StoreScope::Run => format!("{}run_{}/{key}", self.prefix, self.run_id),
        }
    }

    /// Store a value in the given scope.
    pub async fn put(
        &self,
        scope: StoreScope,
        key: &str,
        value: Value,
    ) -> Result<(), CapabilityError> {
        self.backend.put(&self.namespaced(scope, key), value).await
    }

    /// Fetch a value from the given scope.
    pub async fn get(&self, scope: StoreScope, key: &str) -> Result<Option<Value>, CapabilityError> {
        self.backend.get(&self.namespaced(scope, key)).await
    }

    /// Remove a key from the given scope.
    pub async fn delete(&self, scope: StoreScope, key: &str) -> Result<(), CapabilityError> {
        self.backend.delete(&self.namespaced(scope, key)).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File staging
// ─────────────────────────────────────────────────────────────────────────────

/// Backend for step-file blobs.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Persist a write-once blob under the given path, returning a
    /// reference the action can embed in its output.
    async fn save(&self, path: &str, data: Vec<u8>) -> Result<String, CapabilityError>;
}

/// Write-once blob staging associated with the executing step.
pub struct FilesService {
    backend: Arc<dyn FileStore>,
    flow_id: String,
    step_name: String,
}

impl FilesService {
    /// Create a file-staging view for one step execution.
    pub fn new(
        backend: Arc<dyn FileStore>,
        flow_id: impl Into<String>,
        step_name: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            flow_id: flow_id.into(),
            step_name: step_name.into(),
        }
    }

    /// Stage a blob for this step and return its reference.
    pub async fn write(&self, file_name: &str, data: Vec<u8>) -> Result<String, CapabilityError> {
        let path = format!("{}/{}/{file_name}", self.flow_id, self.step_name);
        self.backend.save(&path, data).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sub-flow invocation
// ─────────────────────────────────────────────────────────────────────────────

/// Minimal description of a flow visible to an action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowSummary {
    /// Flow id.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// Backend for listing and triggering flows.
#[async_trait]
pub trait FlowService: Send + Sync {
    /// List flows visible to the current project.
    async fn list(&self) -> Result<Vec<FlowSummary>, CapabilityError>;
    /// Trigger a flow with a payload; when `wait` is set, resolve with the
    /// run's output, otherwise with an acknowledgment.
    async fn trigger(&self, flow_id: &str, payload: Value, wait: bool)
    -> Result<Value, CapabilityError>;
}

/// Sub-flow invocation capability.
pub struct FlowsContext {
    backend: Arc<dyn FlowService>,
    current_flow_id: String,
}

impl FlowsContext {
    /// Create a flows view for one execution.
    pub fn new(backend: Arc<dyn FlowService>, current_flow_id: impl Into<String>) -> Self {
        Self {
            backend,
            current_flow_id: current_flow_id.into(),
        }
    }

    /// The id of the flow this execution belongs to.
    pub fn current_flow_id(&self) -> &str {
        &self.current_flow_id
    }

    /// List flows visible to the current project.
    pub async fn list(&self) -> Result<Vec<FlowSummary>, CapabilityError> {
        self.backend.list().await
    }

    /// Fire another flow; a flow cannot trigger itself.
    pub async fn run(
        &self,
        flow_id: &str,
        payload: Value,
        wait: bool,
    ) -> Result<Value, CapabilityError> {
        if flow_id == self.current_flow_id {
            return Err(CapabilityError::Unavailable(
                "a flow cannot trigger itself".to_string(),
            ));
        }
        self.backend.trigger(flow_id, payload, wait).await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Connections
// ─────────────────────────────────────────────────────────────────────────────

/// Which execution surface connection lookups are attributed to.
///
/// Legacy pieces (context v1) resolved connections through the trigger
/// surface; current pieces use the action surface. The compat shim picks
/// the right one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionTarget {
    /// Action-scoped lookups (current).
    Actions,
    /// Trigger-scoped lookups (legacy).
    Triggers,
}

/// Backend resolving stored connection values.
#[async_trait]
pub trait ConnectionService: Send + Sync {
    /// Resolve the decrypted value of a connection by its external id,
    /// scoped to a project.
    async fn value(
        &self,
        project_id: &str,
        external_id: &str,
        target: ConnectionTarget,
    ) -> Result<Value, CapabilityError>;
}

/// Outbound access to other stored connections, scoped to the project.
pub struct ConnectionManager {
    backend: Arc<dyn ConnectionService>,
    project_id: String,
    target: ConnectionTarget,
}

impl ConnectionManager {
    /// Create a connection view for one execution.
    pub fn new(
        backend: Arc<dyn ConnectionService>,
        project_id: impl Into<String>,
        target: ConnectionTarget,
    ) -> Self {
        Self {
            backend,
            project_id: project_id.into(),
            target,
        }
    }

    /// The surface lookups are attributed to.
    pub fn target(&self) -> ConnectionTarget {
        self.target
    }

    /// Rebuild the manager attributed to a different surface.
    pub fn retargeted(self, target: ConnectionTarget) -> Self {
        Self { target, ..self }
    }

    /// Resolve the decrypted value of a connection by external id.
    pub async fn get(&self, external_id: &str) -> Result<Value, CapabilityError> {
        self.backend
            .value(&self.project_id, external_id, self.target)
            .await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Agent tooling
// ─────────────────────────────────────────────────────────────────────────────

/// A tool surfaced to an agent-style action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTool {
    /// Tool name.
    pub name: String,
    /// What the tool does.
    pub description: String,
    /// JSON schema of the tool's parameters.
    pub parameters: Value,
}

/// Provider of plugin-declared tools for agent-style actions.
#[async_trait]
pub trait AgentToolProvider: Send + Sync {
    /// Resolve the tool set for the given model and requested tool names.
    async fn tools(&self, model: &str, names: &[String]) -> Result<Vec<AgentTool>, CapabilityError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Run lifecycle
// ─────────────────────────────────────────────────────────────────────────────

/// Host-side hooks for run lifecycle control.
pub trait RunLifecycle: Send + Sync {
    /// Stop the enclosing run.
    fn stop(&self);
    /// Pause the enclosing run.
    fn pause(&self);
    /// Respond to the run's caller early.
    fn respond(&self, value: Value);
}

/// Run lifecycle control handed to the action.
///
/// Outside a real flow run there is nothing to control, so the hooks are
/// no-ops when no lifecycle is attached.
pub struct RunControl {
    run_id: String,
    lifecycle: Option<Arc<dyn RunLifecycle>>,
}

impl RunControl {
    /// Control attached to a live run.
    pub fn attached(run_id: impl Into<String>, lifecycle: Arc<dyn RunLifecycle>) -> Self {
        Self {
            run_id: run_id.into(),
            lifecycle: Some(lifecycle),
        }
    }

    /// Detached control for direct execution; all hooks are no-ops.
    pub fn detached(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            lifecycle: None,
        }
    }

    /// Opaque run id, used only for logging and correlation.
    pub fn id(&self) -> &str {
        &self.run_id
    }

    /// Stop the enclosing run, if any.
    pub fn stop(&self) {
        if let Some(lc) = &self.lifecycle {
            lc.stop();
        }
    }

    /// Pause the enclosing run, if any.
    pub fn pause(&self) {
        if let Some(lc) = &self.lifecycle {
            lc.pause();
        }
    }

    /// Respond to the run's caller early, if attached to a run.
    pub fn respond(&self, value: Value) {
        if let Some(lc) = &self.lifecycle {
            lc.respond(value);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// The context
// ─────────────────────────────────────────────────────────────────────────────

/// Project the execution belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectContext {
    /// Internal project id.
    pub id: String,
    /// Externally-visible project id, when the platform maps one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

/// The capability surface passed to a piece action's entry point.
///
/// One instance exists per execution attempt and is exclusively owned by
/// the runner for the lifetime of a single `run` call.
pub struct ActionContext {
    /// Opaque run id for logging only; never persisted.
    pub run_id: String,
    /// Name of the executing step (the action name in direct execution).
    pub step_name: String,
    /// Validated, coerced input values.
    pub props_value: flowdeck_types::InputBag,
    /// Resolved credential value, when one was supplied.
    pub auth: Option<Value>,
    /// Project scope.
    pub project: ProjectContext,
    /// Scoped key/value storage.
    pub store: ContextStore,
    /// Write-once file staging for this step.
    pub files: FilesService,
    /// Sub-flow invocation.
    pub flows: FlowsContext,
    /// Access to other stored connections.
    pub connections: ConnectionManager,
    /// Plugin-declared tool exposure for agent-style actions.
    pub agent: Arc<dyn AgentToolProvider>,
    /// Run lifecycle control.
    pub run: RunControl,
}
