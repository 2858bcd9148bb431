//! Error types for piece resolution.

use thiserror::Error;

/// Errors raised while resolving a piece or one of its actions.
#[derive(Debug, Clone, Error)]
pub enum PieceError {
    /// No piece matches the requested name and version for the platform.
    #[error("piece '{name}' version '{version}' not found")]
    PieceNotFound {
        /// Requested piece name.
        name: String,
        /// Requested piece version.
        version: String,
    },

    /// The piece exists but has no action with the requested name.
    #[error("Action '{action}' not found in piece '{piece}'")]
    ActionNotFound {
        /// Requested action name.
        action: String,
        /// The piece that was searched.
        piece: String,
    },
}
