//! HTTP API for executing piece actions.
//!
//! This crate is the host boundary of the execution pipeline: it wires
//! the piece registry, connection store, engine services, and (in worker
//! mode) the job broker into an axum router exposing
//! `POST /v1/pieces/{piece}/actions/{action}/execute`.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use flowdeck_engine::EngineServices;
//! use flowdeck_pieces::InMemoryPieceRegistry;
//! use flowdeck_server::{AppState, InMemoryConnectionStore, Server, ServerConfig};
//!
//! let state = AppState::new(
//!     Arc::new(InMemoryPieceRegistry::new()),
//!     Arc::new(InMemoryConnectionStore::new()),
//!     Arc::new(EngineServices::in_memory()),
//!     ServerConfig::default(),
//! );
//! Server::from_state(state).run().await?;
//! ```

pub mod config;
pub mod connections;
pub mod error;
pub mod routes;
pub mod service;
pub mod state;

pub use config::{ExecutionMode, ServerConfig};
pub use connections::{
    AppConnection, AppConnectionService, InMemoryConnectionStore, SharedConnectionStore,
};
pub use error::{ErrorResponse, Result, ServerError};
pub use routes::ExecutePieceActionRequest;
pub use service::{ExecutePieceActionParams, PieceExecuteService};
pub use state::AppState;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// The Flowdeck HTTP server.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a server from a pre-built application state.
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        Router::new()
            .merge(routes::health_routes())
            .merge(routes::piece_routes())
            .merge(routes::openapi_routes())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind and serve until the process is stopped.
    pub async fn run(&self) -> std::io::Result<()> {
        let addr = self.state.config.bind_address;
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, mode = ?self.state.config.execution_mode, "server listening");
        axum::serve(listener, self.router()).await
    }
}
