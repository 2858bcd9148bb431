//! Platform-level error type.
//!
//! These are the *protocol* errors of §7 in the service contract: faults
//! tied to a caller-supplied reference (a connection id, a piece name)
//! rather than caller-supplied data. Data-level failures never appear
//! here — they travel inside [`ExecuteActionResponse`] with
//! `success: false`.
//!
//! [`ExecuteActionResponse`]: crate::ExecuteActionResponse

use thiserror::Error;

/// Result type alias using the platform error type.
pub type Result<T> = std::result::Result<T, PlatformError>;

/// Protocol-level errors surfaced to the HTTP boundary.
#[derive(Debug, Clone, Error)]
pub enum PlatformError {
    /// A referenced entity does not exist (stale or foreign id).
    #[error("{entity_type} '{entity_id}' not found")]
    EntityNotFound {
        /// The kind of entity that was looked up.
        entity_type: &'static str,
        /// The id the caller supplied.
        entity_id: String,
    },

    /// A stored connection exists but could not be decrypted or refreshed.
    #[error("Invalid app connection: {0}")]
    InvalidConnection(String),

    /// A piece could not be resolved for the requesting platform.
    #[error("Piece '{name}' version '{version}' not found")]
    PieceNotFound {
        /// Requested piece name.
        name: String,
        /// Requested piece version.
        version: String,
    },
}

impl PlatformError {
    /// Convenience constructor for a missing entity.
    pub fn entity_not_found(entity_type: &'static str, entity_id: impl Into<String>) -> Self {
        Self::EntityNotFound {
            entity_type,
            entity_id: entity_id.into(),
        }
    }
}
