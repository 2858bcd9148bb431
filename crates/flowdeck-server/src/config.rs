//! Server configuration.

use std::net::SocketAddr;
use std::time::Duration;

use flowdeck_broker::BrokerConfig;

/// Default deadline for worker-dispatched executions.
pub const DEFAULT_EXECUTION_TIMEOUT: Duration = Duration::from_secs(60);

/// Where action executions run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Run the engine operation on the request task.
    #[default]
    Local,
    /// Dispatch a job to the worker pool and wait for its response.
    Worker,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind_address: SocketAddr,

    /// Where executions run.
    pub execution_mode: ExecutionMode,

    /// Deadline for a worker-dispatched execution.
    pub execution_timeout: Duration,

    /// Platform requests are attributed to.
    ///
    /// Principal resolution is the authentication layer's concern; this
    /// service receives the platform as configuration.
    pub platform_id: String,

    /// Project used when the request body names none.
    pub default_project_id: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".parse().unwrap(),
            execution_mode: ExecutionMode::default(),
            execution_timeout: DEFAULT_EXECUTION_TIMEOUT,
            platform_id: "default".to_string(),
            default_project_id: "default".to_string(),
        }
    }
}

impl ServerConfig {
    /// Set the bind address.
    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = addr;
        self
    }

    /// Set the execution mode.
    pub fn with_execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.execution_mode = mode;
        self
    }

    /// Set the worker-dispatch deadline.
    pub fn with_execution_timeout(mut self, timeout: Duration) -> Self {
        self.execution_timeout = timeout;
        self
    }

    /// Broker configuration for this server.
    ///
    /// The broker's response deadline is the server's execution timeout;
    /// hosts wiring a broker should build it from here so the two cannot
    /// drift apart.
    pub fn broker_config(&self) -> BrokerConfig {
        BrokerConfig {
            response_timeout: self.execution_timeout,
            ..BrokerConfig::default()
        }
    }
}
