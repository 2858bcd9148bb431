//! In-process execution engine for piece actions.
//!
//! The engine takes a resolved piece action and a raw input bag and runs
//! the action to a verdict: it validates and coerces the input, builds a
//! fresh [`ActionContext`](flowdeck_pieces::ActionContext) exposing the
//! capability surface, adapts that context to the shape the piece was
//! built against, and invokes the entry point exactly once.
//!
//! Nothing in here throws past its boundary: a broken action, a bad
//! input, or an unknown action name all come back as a data-level
//! [`ExecuteActionResponse`](flowdeck_types::ExecuteActionResponse) with
//! `success: false` and an `Ok` engine status.

pub mod compat;
pub mod context_builder;
pub mod operation;
pub mod runner;
pub mod services;

pub use compat::adapt_for_version;
pub use context_builder::{ContextBuilder, ContextParams};
pub use operation::{ExecutePieceActionOperation, execute_piece_action};
pub use runner::run_action;
pub use services::{
    EngineServices, InMemoryConnectionService, InMemoryFileStore, InMemoryKvStore,
    NullAgentToolProvider, UnavailableFlowService,
};
