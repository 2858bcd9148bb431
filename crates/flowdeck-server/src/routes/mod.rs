//! HTTP route handlers.

mod health;
mod openapi;
mod pieces;

pub use health::{HealthResponse, health, health_routes};
pub use openapi::{ApiDoc, openapi_routes};
pub use pieces::{ExecutePieceActionRequest, execute_action_handler, piece_routes};
