//! Worker job records.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::InputBag;

/// Discriminator for the kind of work a job carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerJobType {
    /// Run one piece action outside of a flow.
    ExecutePieceAction,
}

/// A request record handed to the worker dispatch channel.
///
/// Created once by the orchestrating service, consumed by exactly one
/// worker, never re-queued automatically. The `id` doubles as the
/// correlation id tying the eventual response back to the waiting caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerJob {
    /// Correlation id; fresh per submission.
    pub id: Uuid,
    /// What kind of work this is.
    pub job_type: WorkerJobType,
    /// Platform the request is scoped to.
    pub platform_id: String,
    /// Project the request is scoped to.
    pub project_id: String,
    /// Piece to resolve.
    pub piece_name: String,
    /// Piece version to resolve.
    pub piece_version: String,
    /// Action within the piece.
    pub action_name: String,
    /// Resolved input (credential already merged under the reserved key).
    pub input: InputBag,
}
