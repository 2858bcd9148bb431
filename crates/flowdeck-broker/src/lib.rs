//! Job broker: the request/response correlation layer.
//!
//! A caller submits a job for a worker pool and suspends until a response
//! tagged with the job's correlation id arrives, or a deadline elapses.
//! The broker owns the only piece of state shared across concurrent
//! executions: the waiter table mapping correlation ids to pending
//! oneshot senders.
//!
//! Invariants:
//!
//! - a waiter is settled at most once; the second response for the same
//!   correlation id is discarded,
//! - every exit path (settlement, timeout, caller cancellation) evicts
//!   the waiter from the table, so sustained worker unavailability does
//!   not grow memory without bound,
//! - a late response for an evicted id is logged at debug and dropped.

pub mod broker;
pub mod worker;

pub use broker::{BrokerConfig, BrokerError, JobBroker, JobSubmission, OperationResponse};
pub use worker::run_worker;
