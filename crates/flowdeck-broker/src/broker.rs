//! The waiter table and submit-and-wait primitive.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};
use uuid::Uuid;

use flowdeck_types::{
    EngineResponse, ExecuteActionResponse, InputBag, WorkerJob, WorkerJobType,
};

/// Default deadline for a submitted job.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(60);

/// Default capacity of the worker dispatch channel.
pub const DEFAULT_DISPATCH_CAPACITY: usize = 256;

/// The response a worker posts back for a processed job.
pub type OperationResponse = EngineResponse<ExecuteActionResponse>;

/// Broker configuration.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// How long a caller waits for a matching response.
    pub response_timeout: Duration,
    /// Bound of the dispatch channel to the worker pool.
    pub dispatch_capacity: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            dispatch_capacity: DEFAULT_DISPATCH_CAPACITY,
        }
    }
}

/// Errors a submission can end with.
///
/// These are *transport* conditions; the orchestrating service maps them
/// to data-level failures rather than letting them propagate.
#[derive(Debug, Clone, Error)]
pub enum BrokerError {
    /// No response arrived before the deadline.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// The dispatch channel is closed; no worker can take the job.
    #[error("worker dispatch channel closed")]
    DispatchClosed,

    /// The waiter was dropped without a response (broker shutting down).
    #[error("waiter dropped before settlement")]
    WaiterDropped,
}

/// A job to submit, minus the correlation id the broker generates.
#[derive(Debug, Clone)]
pub struct JobSubmission {
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
    /// Resolved input.
    pub input: InputBag,
}

impl JobSubmission {
    fn into_job(self, id: Uuid) -> WorkerJob {
        WorkerJob {
            id,
            job_type: self.job_type,
            platform_id: self.platform_id,
            project_id: self.project_id,
            piece_name: self.piece_name,
            piece_version: self.piece_version,
            action_name: self.action_name,
            input: self.input,
        }
    }
}

type WaiterTable = Arc<Mutex<HashMap<Uuid, oneshot::Sender<OperationResponse>>>>;

/// Removes the waiter on drop, covering timeout and caller cancellation
/// with one mechanism. A no-op when the waiter was already settled.
struct WaiterGuard {
    waiters: WaiterTable,
    id: Uuid,
}

impl Drop for WaiterGuard {
    fn drop(&mut self) {
        if self.waiters.lock().remove(&self.id).is_some() {
            trace!(correlation_id = %self.id, "evicted unsettled waiter");
        }
    }
}

/// Correlates submitted jobs with worker responses.
pub struct JobBroker {
    waiters: WaiterTable,
    dispatch_tx: mpsc::Sender<WorkerJob>,
    config: BrokerConfig,
}

impl JobBroker {
    /// Create a broker; the returned receiver is the worker pool's end of
    /// the dispatch channel. Each job is delivered to exactly one worker.
    pub fn new(config: BrokerConfig) -> (Self, mpsc::Receiver<WorkerJob>) {
        let (dispatch_tx, dispatch_rx) = mpsc::channel(config.dispatch_capacity);
        (
            Self {
                waiters: Arc::new(Mutex::new(HashMap::new())),
                dispatch_tx,
                config,
            },
            dispatch_rx,
        )
    }

    /// Number of unsettled waiters; used to verify eviction.
    pub fn pending(&self) -> usize {
        self.waiters.lock().len()
    }

    /// Submit a job and suspend until its response arrives or the
    /// deadline elapses.
    ///
    /// Dropping the returned future before settlement releases the
    /// waiter; the worker job itself is not cancelled, and its late
    /// response will be discarded.
    pub async fn submit_and_wait(
        &self,
        submission: JobSubmission,
    ) -> Result<OperationResponse, BrokerError> {
        let id = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();
        self.waiters.lock().insert(id, tx);
        let _guard = WaiterGuard {
            waiters: self.waiters.clone(),
            id,
        };

        let job = submission.into_job(id);
        debug!(correlation_id = %id, action = %job.action_name, "submitting job");

        if self.dispatch_tx.send(job).await.is_err() {
            return Err(BrokerError::DispatchClosed);
        }

        match tokio::time::timeout(self.config.response_timeout, rx).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(_)) => Err(BrokerError::WaiterDropped),
            Err(_) => {
                debug!(correlation_id = %id, "job timed out");
                Err(BrokerError::Timeout(self.config.response_timeout))
            }
        }
    }

    /// Deliver a worker's response to the waiter registered under the
    /// correlation id.
    ///
    /// Settlement is exactly-once: the waiter is removed before the send,
    /// so a duplicate response finds no waiter. Responses for unknown,
    /// settled, or evicted ids are logged and dropped.
    pub fn handle_response(&self, correlation_id: Uuid, response: OperationResponse) {
        let waiter = self.waiters.lock().remove(&correlation_id);
        match waiter {
            Some(tx) => {
                if tx.send(response).is_err() {
                    // The submitter cancelled between eviction and send.
                    debug!(%correlation_id, "dropping response for cancelled waiter");
                }
            }
            None => {
                debug!(%correlation_id, "dropping response for unknown or settled correlation id");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowdeck_types::EngineResponseStatus;
    use serde_json::json;

    fn submission() -> JobSubmission {
        JobSubmission {
            job_type: WorkerJobType::ExecutePieceAction,
            platform_id: "platform-1".to_string(),
            project_id: "project-1".to_string(),
            piece_name: "@flowdeck/piece-pay".to_string(),
            piece_version: "1.0.0".to_string(),
            action_name: "charge".to_string(),
            input: InputBag::new(),
        }
    }

    fn ok_response(output: serde_json::Value) -> OperationResponse {
        EngineResponse::ok(ExecuteActionResponse::success(InputBag::new(), output))
    }

    #[tokio::test]
    async fn response_with_matching_id_settles_the_waiter() {
        let (broker, mut jobs) = JobBroker::new(BrokerConfig::default());
        let broker = Arc::new(broker);

        let responder = broker.clone();
        let worker = tokio::spawn(async move {
            let job = jobs.recv().await.unwrap();
            responder.handle_response(job.id, ok_response(json!("done")));
        });

        let response = broker.submit_and_wait(submission()).await.unwrap();
        assert_eq!(response.status, EngineResponseStatus::Ok);
        assert_eq!(response.response.output, json!("done"));
        assert_eq!(broker.pending(), 0);
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_response_is_discarded_and_first_result_stands() {
        let (broker, mut jobs) = JobBroker::new(BrokerConfig::default());
        let broker = Arc::new(broker);

        let responder = broker.clone();
        let worker = tokio::spawn(async move {
            let job = jobs.recv().await.unwrap();
            responder.handle_response(job.id, ok_response(json!("first")));
            // Duplicate delivery from the transport.
            responder.handle_response(job.id, ok_response(json!("second")));
        });

        let response = broker.submit_and_wait(submission()).await.unwrap();
        assert_eq!(response.response.output, json!("first"));
        assert_eq!(broker.pending(), 0);
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn timeout_returns_error_and_evicts_the_waiter() {
        let (broker, _jobs) = JobBroker::new(BrokerConfig {
            response_timeout: Duration::from_millis(25),
            ..BrokerConfig::default()
        });

        let err = broker.submit_and_wait(submission()).await.unwrap_err();
        assert!(matches!(err, BrokerError::Timeout(_)));
        assert_eq!(broker.pending(), 0);
    }

    #[tokio::test]
    async fn repeated_timeouts_do_not_grow_the_table() {
        let (broker, _jobs) = JobBroker::new(BrokerConfig {
            response_timeout: Duration::from_millis(10),
            ..BrokerConfig::default()
        });

        for _ in 0..8 {
            let _ = broker.submit_and_wait(submission()).await;
        }
        assert_eq!(broker.pending(), 0);
    }

    #[tokio::test]
    async fn cancelled_submission_releases_the_waiter_and_discards_late_response() {
        let (broker, mut jobs) = JobBroker::new(BrokerConfig::default());
        let broker = Arc::new(broker);

        let submitter = broker.clone();
        let pending = tokio::spawn(async move { submitter.submit_and_wait(submission()).await });

        // Wait until the job is dispatched, then abort the caller.
        let job = jobs.recv().await.unwrap();
        pending.abort();
        assert!(pending.await.unwrap_err().is_cancelled());
        assert_eq!(broker.pending(), 0);

        // The worker may still complete; its late response is dropped.
        broker.handle_response(job.id, ok_response(json!("late")));
        assert_eq!(broker.pending(), 0);
    }

    #[tokio::test]
    async fn concurrent_submissions_resolve_independently() {
        let (broker, mut jobs) = JobBroker::new(BrokerConfig::default());
        let broker = Arc::new(broker);

        let responder = broker.clone();
        let worker = tokio::spawn(async move {
            // Answer in reverse arrival order to prove ids, not ordering,
            // drive settlement.
            let first = jobs.recv().await.unwrap();
            let second = jobs.recv().await.unwrap();
            responder.handle_response(second.id, ok_response(json!("b")));
            responder.handle_response(first.id, ok_response(json!("a")));
        });

        let mut a = submission();
        a.action_name = "a".to_string();
        let mut b = submission();
        b.action_name = "b".to_string();

        let (ra, rb) = tokio::join!(broker.submit_and_wait(a), broker.submit_and_wait(b));
        assert_eq!(ra.unwrap().response.output, json!("a"));
        assert_eq!(rb.unwrap().response.output, json!("b"));
        assert_eq!(broker.pending(), 0);
        worker.await.unwrap();
    }

    #[tokio::test]
    async fn closed_dispatch_channel_is_reported() {
        let (broker, jobs) = JobBroker::new(BrokerConfig::default());
        drop(jobs);

        let err = broker.submit_and_wait(submission()).await.unwrap_err();
        assert!(matches!(err, BrokerError::DispatchClosed));
        assert_eq!(broker.pending(), 0);
    }
}
