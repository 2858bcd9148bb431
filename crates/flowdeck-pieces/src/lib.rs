//! Piece framework for Flowdeck.
//!
//! A *piece* is a named, versioned bundle of third-party integration
//! logic. Each piece exposes actions, and each action declares an ordered
//! input schema ("props") plus whether it requires an authentication
//! value. This crate owns:
//!
//! - the property schema types ([`PieceProperty`], [`PropertyType`]),
//! - the props processor that validates and coerces caller input,
//! - the contract a piece action is written against ([`ActionHandler`],
//!   [`ActionContext`] and its capability objects),
//! - the [`PieceRegistry`] seam the engine resolves pieces through.
//!
//! Loading piece packages from disk or a registry service is a host
//! concern; this crate only defines the shapes and an in-memory registry
//! used by hosts and tests.

pub mod action;
pub mod context;
pub mod error;
pub mod processor;
pub mod props;
pub mod registry;

pub use action::{ActionError, ActionHandler, ContextVersion, PieceAction, PieceMetadata};
pub use context::{
    ActionContext, AgentTool, AgentToolProvider, CapabilityError, ConnectionManager,
    ConnectionService, ConnectionTarget, ContextStore, FileStore, FilesService, FlowService,
    FlowSummary, FlowsContext, KvStore, ProjectContext, RunControl, RunLifecycle, StoreScope,
};
pub use error::PieceError;
pub use processor::{
    ProcessedProps, ProcessorOptions, ValidationErrorSet, apply_processors_and_validators,
};
pub use props::{AuthScheme, InputPropertyMap, PieceAuthProperty, PieceProperty, PropertyType};
pub use registry::{InMemoryPieceRegistry, PieceRegistry, SharedPieceRegistry, resolve_action};
