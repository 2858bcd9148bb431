//! The piece registry seam.
//!
//! Resolution of `(piece name, piece version)` to loaded metadata is a
//! host concern — packages may come from disk, a private registry, or a
//! remote service. The engine only sees the [`PieceRegistry`] trait. The
//! in-memory implementation backs hosts with statically registered pieces
//! and every test in the workspace.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::action::{PieceAction, PieceMetadata};
use crate::error::PieceError;

/// Shared handle to a piece registry.
pub type SharedPieceRegistry = Arc<dyn PieceRegistry>;

/// Resolves piece metadata for a platform.
#[async_trait]
pub trait PieceRegistry: Send + Sync {
    /// Look up one piece version visible to the given platform.
    async fn get(&self, name: &str, version: &str, platform_id: &str)
    -> Option<Arc<PieceMetadata>>;
}

/// Resolve a piece and one of its actions, or fail with the appropriate
/// resolution error.
///
/// A missing piece and a missing action are distinct conditions: the
/// caller maps the former to a protocol error and the latter to a
/// data-level failure.
pub async fn resolve_action(
    registry: &dyn PieceRegistry,
    piece_name: &str,
    piece_version: &str,
    platform_id: &str,
    action_name: &str,
) -> Result<(Arc<PieceMetadata>, Arc<PieceAction>), PieceError> {
    let piece = registry
        .get(piece_name, piece_version, platform_id)
        .await
        .ok_or_else(|| PieceError::PieceNotFound {
            name: piece_name.to_string(),
            version: piece_version.to_string(),
        })?;

    let action = piece
        .actions
        .get(action_name)
        .cloned()
        .ok_or_else(|| PieceError::ActionNotFound {
            action: action_name.to_string(),
            piece: piece_name.to_string(),
        })?;

    Ok((piece, action))
}

/// Registry backed by a process-local map.
#[derive(Default)]
pub struct InMemoryPieceRegistry {
    pieces: RwLock<HashMap<(String, String), Arc<PieceMetadata>>>,
}

impl InMemoryPieceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a piece version, replacing any previous registration.
    pub fn register(&self, piece: PieceMetadata) {
        let key = (piece.name.clone(), piece.version.clone());
        debug!(piece = %key.0, version = %key.1, "registering piece");
        self.pieces.write().insert(key, Arc::new(piece));
    }
}

#[async_trait]
impl PieceRegistry for InMemoryPieceRegistry {
    async fn get(
        &self,
        name: &str,
        version: &str,
        platform_id: &str,
    ) -> Option<Arc<PieceMetadata>> {
        let piece = self
            .pieces
            .read()
            .get(&(name.to_string(), version.to_string()))
            .cloned()?;

        // Private pieces are only visible to their own platform.
        match &piece.platform_id {
            Some(owner) if owner != platform_id => None,
            _ => Some(piece),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionError, ActionHandler};
    use crate::context::ActionContext;
    use crate::props::InputPropertyMap;
    use serde_json::Value;

    struct Noop;

    #[async_trait]
    impl ActionHandler for Noop {
        async fn run(&self, _ctx: ActionContext) -> Result<Value, ActionError> {
            Ok(Value::Null)
        }
    }

    fn piece(name: &str) -> PieceMetadata {
        PieceMetadata::new(name, "1.0.0").with_action(PieceAction::new(
            "do_it",
            InputPropertyMap::new(),
            false,
            Arc::new(Noop),
        ))
    }

    #[tokio::test]
    async fn resolves_registered_piece_and_action() {
        let registry = InMemoryPieceRegistry::new();
        registry.register(piece("@flowdeck/piece-http"));

        let resolved =
            resolve_action(&registry, "@flowdeck/piece-http", "1.0.0", "platform-1", "do_it").await;
        assert!(resolved.is_ok());
    }

    #[tokio::test]
    async fn missing_action_is_distinct_from_missing_piece() {
        let registry = InMemoryPieceRegistry::new();
        registry.register(piece("@flowdeck/piece-http"));

        let err =
            resolve_action(&registry, "@flowdeck/piece-http", "1.0.0", "platform-1", "nope")
                .await
                .unwrap_err();
        assert!(matches!(err, PieceError::ActionNotFound { .. }));

        let err = resolve_action(&registry, "@flowdeck/piece-gone", "1.0.0", "platform-1", "do_it")
            .await
            .unwrap_err();
        assert!(matches!(err, PieceError::PieceNotFound { .. }));
    }

    #[tokio::test]
    async fn private_piece_is_hidden_from_other_platforms() {
        let registry = InMemoryPieceRegistry::new();
        registry.register(piece("@flowdeck/piece-internal").private_to("platform-1"));

        assert!(
            registry
                .get("@flowdeck/piece-internal", "1.0.0", "platform-1")
                .await
                .is_some()
        );
        assert!(
            registry
                .get("@flowdeck/piece-internal", "1.0.0", "platform-2")
                .await
                .is_none()
        );
    }
}
