//! Capability backends the engine is configured with.
//!
//! [`EngineServices`] is the immutable configuration the context builder
//! draws from. The backends are shared across executions — what must
//! never be shared are the per-execution capability objects built on top
//! of them.
//!
//! The in-memory implementations back single-process deployments and the
//! test suite; a host wiring the engine to real storage implements the
//! same traits.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use flowdeck_pieces::{
    AgentTool, AgentToolProvider, CapabilityError, ConnectionService, ConnectionTarget, FileStore,
    FlowService, FlowSummary, KvStore,
};

/// The capability backends and fixed settings the engine builds contexts
/// from. Construct once, share via `Arc`.
#[derive(Clone)]
pub struct EngineServices {
    /// Key/value storage backend.
    pub kv: Arc<dyn KvStore>,
    /// Step-file blob backend.
    pub files: Arc<dyn FileStore>,
    /// Flow listing/triggering backend.
    pub flows: Arc<dyn FlowService>,
    /// Stored-connection resolution backend.
    pub connections: Arc<dyn ConnectionService>,
    /// Agent tool provider.
    pub agent_tools: Arc<dyn AgentToolProvider>,
    /// Installation-wide prefix for store namespacing.
    pub store_prefix: String,
}

impl EngineServices {
    /// All-in-memory services, as used by single-process hosts and tests.
    pub fn in_memory() -> Self {
        Self {
            kv: Arc::new(InMemoryKvStore::default()),
            files: Arc::new(InMemoryFileStore::default()),
            flows: Arc::new(UnavailableFlowService),
            connections: Arc::new(InMemoryConnectionService::default()),
            agent_tools: Arc::new(NullAgentToolProvider),
            store_prefix: String::new(),
        }
    }
}

/// Key/value store backed by a process-local map.
#[derive(Default)]
pub struct InMemoryKvStore {
    entries: Mutex<HashMap<String, Value>>,
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn put(&self, key: &str, value: Value) -> Result<(), CapabilityError> {
        self.entries.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, CapabilityError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), CapabilityError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// Write-once blob store backed by a process-local map.
#[derive(Default)]
pub struct InMemoryFileStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl FileStore for InMemoryFileStore {
    async fn save(&self, path: &str, data: Vec<u8>) -> Result<String, CapabilityError> {
        let mut blobs = self.blobs.lock();
        if blobs.contains_key(path) {
            return Err(CapabilityError::Backend(format!(
                "file '{path}' already staged"
            )));
        }
        blobs.insert(path.to_string(), data);
        Ok(format!("memory://{path}"))
    }
}

/// Flow backend for deployments with no flow engine attached.
///
/// Direct action execution has no enclosing flow and no flow engine to
/// delegate to: listing yields nothing and triggering reports the
/// capability as unavailable.
pub struct UnavailableFlowService;

#[async_trait]
impl FlowService for UnavailableFlowService {
    async fn list(&self) -> Result<Vec<FlowSummary>, CapabilityError> {
        Ok(Vec::new())
    }

    async fn trigger(
        &self,
        flow_id: &str,
        _payload: Value,
        _wait: bool,
    ) -> Result<Value, CapabilityError> {
        Err(CapabilityError::Unavailable(format!(
            "no flow engine attached; cannot trigger flow '{flow_id}'"
        )))
    }
}

/// Connection backend backed by a process-local map keyed by
/// `(project id, external id)`.
#[derive(Default)]
pub struct InMemoryConnectionService {
    values: Mutex<HashMap<(String, String), Value>>,
}

impl InMemoryConnectionService {
    /// Store a connection value for lookups by actions.
    pub fn insert(
        &self,
        project_id: impl Into<String>,
        external_id: impl Into<String>,
        value: Value,
    ) {
        self.values
            .lock()
            .insert((project_id.into(), external_id.into()), value);
    }
}

#[async_trait]
impl ConnectionService for InMemoryConnectionService {
    async fn value(
        &self,
        project_id: &str,
        external_id: &str,
        _target: ConnectionTarget,
    ) -> Result<Value, CapabilityError> {
        self.values
            .lock()
            .get(&(project_id.to_string(), external_id.to_string()))
            .cloned()
            .ok_or_else(|| CapabilityError::NotFound(format!("connection '{external_id}'")))
    }
}

/// Tool provider that exposes no tools.
pub struct NullAgentToolProvider;

#[async_trait]
impl AgentToolProvider for NullAgentToolProvider {
    async fn tools(
        &self,
        _model: &str,
        _names: &[String],
    ) -> Result<Vec<AgentTool>, CapabilityError> {
        Ok(Vec::new())
    }
}
