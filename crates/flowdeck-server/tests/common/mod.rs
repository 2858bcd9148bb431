//! Common test utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

use flowdeck_engine::EngineServices;
use flowdeck_pieces::{
    ActionContext, ActionError, ActionHandler, AuthScheme, InMemoryPieceRegistry,
    InputPropertyMap, PieceAction, PieceAuthProperty, PieceMetadata, PieceProperty, PropertyType,
};
use flowdeck_server::{AppState, InMemoryConnectionStore, Server, ServerConfig};

/// A test server that runs in the background.
pub struct TestServer {
    /// The server's address.
    pub addr: SocketAddr,
    /// HTTP client configured for this server.
    pub client: Client,
    /// Handle to the server task.
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a server over the given state on an ephemeral port.
    pub async fn start(state: AppState) -> Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let router = Server::from_state(state).router();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });

        Ok(Self {
            addr,
            client: Client::new(),
            _handle: handle,
        })
    }

    /// URL of the execute endpoint for a piece/action pair.
    ///
    /// Piece names are scoped (`@flowdeck/piece-pay`), so the embedded
    /// slash must be percent-encoded to stay a single path segment.
    pub fn execute_url(&self, piece: &str, action: &str) -> String {
        let piece = piece.replace('%', "%25").replace('/', "%2F");
        format!(
            "http://{}/v1/pieces/{piece}/actions/{action}/execute",
            self.addr
        )
    }

    /// POST an execute request and return the response.
    pub async fn execute(
        &self,
        piece: &str,
        action: &str,
        body: Value,
    ) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(self.execute_url(piece, action))
            .json(&body)
            .send()
            .await?)
    }
}

/// Echoes its processed props, with the auth value under `"auth_seen"`.
pub struct EchoAction;

#[async_trait]
impl ActionHandler for EchoAction {
    async fn run(&self, ctx: ActionContext) -> Result<Value, ActionError> {
        let mut output = ctx.props_value.clone();
        if let Some(auth) = ctx.auth {
            output.insert("auth_seen".to_string(), auth);
        }
        Ok(Value::Object(output))
    }
}

/// Always fails with a fixed message.
pub struct FailingAction;

#[async_trait]
impl ActionHandler for FailingAction {
    async fn run(&self, _ctx: ActionContext) -> Result<Value, ActionError> {
        Err(ActionError::msg("rate limited"))
    }
}

/// A registry with one piece (`@flowdeck/piece-pay` 1.0.0) exposing:
/// - `charge`: required numeric `amount`, no auth
/// - `charge_with_auth`: required numeric `amount`, requires auth
/// - `always_fails`: no props, fails with "rate limited"
pub fn test_registry() -> Arc<InMemoryPieceRegistry> {
    let registry = InMemoryPieceRegistry::new();

    let amount_props = || {
        let mut props = InputPropertyMap::new();
        props.insert(
            "amount".to_string(),
            PieceProperty::new("Amount", PropertyType::Number, true),
        );
        props
    };

    registry.register(
        PieceMetadata::new("@flowdeck/piece-pay", "1.0.0")
            .with_auth(PieceAuthProperty::new("API Key", AuthScheme::SecretText))
            .with_action(PieceAction::new(
                "charge",
                amount_props(),
                false,
                Arc::new(EchoAction),
            ))
            .with_action(PieceAction::new(
                "charge_with_auth",
                amount_props(),
                true,
                Arc::new(EchoAction),
            ))
            .with_action(PieceAction::new(
                "always_fails",
                InputPropertyMap::new(),
                false,
                Arc::new(FailingAction),
            )),
    );

    Arc::new(registry)
}

/// Local-mode state over the test registry and an empty connection store.
pub fn local_state(connections: Arc<InMemoryConnectionStore>) -> AppState {
    AppState::new(
        test_registry(),
        connections,
        Arc::new(EngineServices::in_memory()),
        ServerConfig::default(),
    )
}

/// A standard execute body with the given input.
pub fn body_with_input(input: Value) -> Value {
    json!({
        "pieceVersion": "1.0.0",
        "input": input,
    })
}
