//! Shared types for the Flowdeck automation platform.
//!
//! Everything that crosses a crate boundary lives here: the execute-action
//! response shape returned to callers, the engine response envelope used
//! between the broker and workers, worker job records, and the
//! platform-level error type.

pub mod error;
pub mod job;
pub mod response;

pub use error::{PlatformError, Result};
pub use job::{WorkerJob, WorkerJobType};
pub use response::{
    EngineResponse, EngineResponseStatus, ExecuteActionResponse, ExecutionOutcome,
};

/// Reserved input-bag key under which a resolved connection credential is
/// injected before execution.
pub const AUTHENTICATION_PROPERTY_NAME: &str = "auth";

/// Sentinel flow id used when an action runs outside of a flow.
pub const DIRECT_EXECUTION_FLOW_ID: &str = "direct-execution";

/// A caller-supplied or processed bag of input values, keyed by field name.
pub type InputBag = serde_json::Map<String, serde_json::Value>;
