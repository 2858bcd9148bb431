//! The app-connection seam.
//!
//! Credential storage, encryption at rest, and token refresh belong to
//! the platform's connection subsystem; this service only needs to turn
//! a connection id into a decrypted value scoped to the caller's project
//! and platform. The in-memory implementation backs tests and
//! single-process deployments.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use flowdeck_types::PlatformError;

/// Shared handle to a connection service.
pub type SharedConnectionStore = Arc<dyn AppConnectionService>;

/// A stored connection record, value still encrypted.
#[derive(Debug, Clone)]
pub struct AppConnection {
    /// Connection id.
    pub id: String,
    /// Projects allowed to use this connection.
    pub project_ids: Vec<String>,
    /// Owning platform.
    pub platform_id: String,
}

/// Resolves stored connections to decrypted credential values.
#[async_trait]
pub trait AppConnectionService: Send + Sync {
    /// Find a connection by id, scoped to a project and platform.
    async fn find(
        &self,
        connection_id: &str,
        project_id: &str,
        platform_id: &str,
    ) -> Option<AppConnection>;

    /// Decrypt the stored value, refreshing a stale token first.
    ///
    /// A refresh persists the new token as a side effect; callers must
    /// invoke this at most once per execution attempt and never retry it
    /// automatically.
    async fn decrypt_and_refresh(
        &self,
        connection: &AppConnection,
        project_id: &str,
    ) -> Result<Value, PlatformError>;
}

enum StoredValue {
    Plain(Value),
    /// Simulates a record whose ciphertext no longer decrypts.
    Corrupted,
}

/// Connection store backed by a process-local map.
#[derive(Default)]
pub struct InMemoryConnectionStore {
    records: RwLock<HashMap<String, (AppConnection, StoredValue)>>,
}

impl InMemoryConnectionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a connection with its decrypted value.
    pub fn insert(&self, connection: AppConnection, value: Value) {
        self.records
            .write()
            .insert(connection.id.clone(), (connection, StoredValue::Plain(value)));
    }

    /// Store a connection whose value can no longer be decrypted.
    pub fn insert_corrupted(&self, connection: AppConnection) {
        self.records
            .write()
            .insert(connection.id.clone(), (connection, StoredValue::Corrupted));
    }
}

#[async_trait]
impl AppConnectionService for InMemoryConnectionStore {
    async fn find(
        &self,
        connection_id: &str,
        project_id: &str,
        platform_id: &str,
    ) -> Option<AppConnection> {
        let records = self.records.read();
        let (connection, _) = records.get(connection_id)?;
        let scoped = connection.platform_id == platform_id
            && connection.project_ids.iter().any(|p| p == project_id);
        scoped.then(|| connection.clone())
    }

    async fn decrypt_and_refresh(
        &self,
        connection: &AppConnection,
        _project_id: &str,
    ) -> Result<Value, PlatformError> {
        let records = self.records.read();
        match records.get(&connection.id) {
            Some((_, StoredValue::Plain(value))) => Ok(value.clone()),
            Some((_, StoredValue::Corrupted)) => Err(PlatformError::InvalidConnection(
                "Failed to decrypt or refresh connection".to_string(),
            )),
            None => Err(PlatformError::entity_not_found(
                "AppConnection",
                connection.id.clone(),
            )),
        }
    }
}
