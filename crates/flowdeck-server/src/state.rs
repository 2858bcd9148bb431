//! Application state shared across handlers.

use std::sync::Arc;

use flowdeck_broker::JobBroker;
use flowdeck_engine::EngineServices;
use flowdeck_pieces::SharedPieceRegistry;

use crate::config::ServerConfig;
use crate::connections::SharedConnectionStore;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Piece registry.
    pub registry: SharedPieceRegistry,

    /// Connection store.
    pub connections: SharedConnectionStore,

    /// Capability backends for in-process execution.
    pub engine_services: Arc<EngineServices>,

    /// Job broker; present in worker mode.
    pub broker: Option<Arc<JobBroker>>,

    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// State for local (in-process) execution.
    pub fn new(
        registry: SharedPieceRegistry,
        connections: SharedConnectionStore,
        engine_services: Arc<EngineServices>,
        config: ServerConfig,
    ) -> Self {
        Self {
            registry,
            connections,
            engine_services,
            broker: None,
            config: Arc::new(config),
        }
    }

    /// Attach a broker for worker-mode dispatch.
    pub fn with_broker(mut self, broker: Arc<JobBroker>) -> Self {
        self.broker = Some(broker);
        self
    }
}
