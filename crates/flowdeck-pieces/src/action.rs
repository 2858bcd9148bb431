//! Piece actions and piece metadata.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::context::ActionContext;
use crate::props::{InputPropertyMap, PieceAuthProperty};

/// Fault raised by an action's entry point.
///
/// Piece code reports failures as messages; anything structured is
/// stringified at the boundary, matching the runner's contract that a
/// broken piece never crashes the host.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ActionError(pub String);

impl ActionError {
    /// Create an error from any displayable message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<String> for ActionError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for ActionError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

impl From<serde_json::Error> for ActionError {
    fn from(e: serde_json::Error) -> Self {
        Self(e.to_string())
    }
}

/// The entry point of a piece action.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Run the action with the built context.
    ///
    /// Called exactly once per execution attempt; the context is consumed
    /// and dropped when the call returns.
    async fn run(&self, ctx: ActionContext) -> Result<Value, ActionError>;
}

/// Context shape a piece was written against.
///
/// Newer hosts keep serving pieces built against older context shapes; an
/// adapter maps the current context into the historical shape keyed by
/// this marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextVersion {
    /// Pre-agent context: connection lookups go through the trigger
    /// surface and no tool provider is exposed.
    V1,
    /// Current context shape.
    #[default]
    V2,
}

/// A single callable operation exposed by a piece.
#[derive(Clone)]
pub struct PieceAction {
    /// Action name, unique within the piece.
    pub name: String,
    /// Human-readable name.
    pub display_name: String,
    /// Declared input schema, in form order.
    pub props: InputPropertyMap,
    /// Whether the processed input must carry an authentication value.
    pub require_auth: bool,
    /// The entry point.
    pub handler: Arc<dyn ActionHandler>,
}

impl PieceAction {
    /// Create an action.
    pub fn new(
        name: impl Into<String>,
        props: InputPropertyMap,
        require_auth: bool,
        handler: Arc<dyn ActionHandler>,
    ) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            props,
            require_auth,
            handler,
        }
    }
}

impl std::fmt::Debug for PieceAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PieceAction")
            .field("name", &self.name)
            .field("require_auth", &self.require_auth)
            .field("props", &self.props.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Loaded metadata of one piece version.
///
/// Immutable once loaded; owned by the registry.
#[derive(Debug, Clone)]
pub struct PieceMetadata {
    /// Piece name, e.g. `@flowdeck/piece-notion`.
    pub name: String,
    /// Semver version string.
    pub version: String,
    /// Authentication declaration, if the piece authenticates.
    pub auth: Option<PieceAuthProperty>,
    /// Actions by name.
    pub actions: HashMap<String, Arc<PieceAction>>,
    /// Context shape this piece was built against.
    pub context_version: ContextVersion,
    /// When set, the piece is private to one platform.
    pub platform_id: Option<String>,
}

impl PieceMetadata {
    /// Create piece metadata with no actions registered yet.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            auth: None,
            actions: HashMap::new(),
            context_version: ContextVersion::default(),
            platform_id: None,
        }
    }

    /// Declare the piece's authentication property.
    pub fn with_auth(mut self, auth: PieceAuthProperty) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Register an action.
    pub fn with_action(mut self, action: PieceAction) -> Self {
        self.actions.insert(action.name.clone(), Arc::new(action));
        self
    }

    /// Mark the piece as built against an older context shape.
    pub fn with_context_version(mut self, version: ContextVersion) -> Self {
        self.context_version = version;
        self
    }

    /// Restrict the piece to one platform.
    pub fn private_to(mut self, platform_id: impl Into<String>) -> Self {
        self.platform_id = Some(platform_id.into());
        self
    }
}
