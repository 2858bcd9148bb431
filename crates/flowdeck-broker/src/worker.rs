//! In-process worker loop.
//!
//! Drains the dispatch channel, runs each job through the engine, and
//! posts the response back under the job's correlation id. Run several
//! of these over clones of the same broker to form a pool; the mpsc
//! channel guarantees each job reaches exactly one of them.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use flowdeck_engine::{EngineServices, ExecutePieceActionOperation, execute_piece_action};
use flowdeck_pieces::SharedPieceRegistry;
use flowdeck_types::{WorkerJob, WorkerJobType};

use crate::broker::JobBroker;

/// Consume jobs until the dispatch channel closes.
///
/// Each job runs in its own task so one slow action does not stall the
/// queue behind it.
pub async fn run_worker(
    mut jobs: mpsc::Receiver<WorkerJob>,
    broker: Arc<JobBroker>,
    registry: SharedPieceRegistry,
    services: Arc<EngineServices>,
) {
    info!("worker started");
    while let Some(job) = jobs.recv().await {
        debug!(correlation_id = %job.id, action = %job.action_name, "worker picked up job");
        let broker = broker.clone();
        let registry = registry.clone();
        let services = services.clone();
        tokio::spawn(async move {
            match job.job_type {
                WorkerJobType::ExecutePieceAction => {
                    let operation = ExecutePieceActionOperation::from(&job);
                    let response =
                        execute_piece_action(registry.as_ref(), &services, operation).await;
                    broker.handle_response(job.id, response);
                }
            }
        });
    }
    info!("worker stopped: dispatch channel closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{BrokerConfig, JobSubmission};
    use async_trait::async_trait;
    use flowdeck_pieces::{
        ActionContext, ActionError, ActionHandler, InMemoryPieceRegistry, InputPropertyMap,
        PieceAction, PieceMetadata, PieceProperty, PropertyType,
    };
    use flowdeck_types::{EngineResponseStatus, InputBag};
    use serde_json::{Value, json};

    struct Doubler;

    #[async_trait]
    impl ActionHandler for Doubler {
        async fn run(&self, ctx: ActionContext) -> Result<Value, ActionError> {
            let amount = ctx
                .props_value
                .get("amount")
                .and_then(Value::as_i64)
                .ok_or_else(|| ActionError::msg("amount missing"))?;
            Ok(json!(amount * 2))
        }
    }

    #[tokio::test]
    async fn worker_executes_job_and_settles_the_waiter() {
        let registry = Arc::new(InMemoryPieceRegistry::new());
        let mut props = InputPropertyMap::new();
        props.insert(
            "amount".to_string(),
            PieceProperty::new("Amount", PropertyType::Number, true),
        );
        registry.register(
            PieceMetadata::new("@flowdeck/piece-pay", "1.0.0").with_action(PieceAction::new(
                "double",
                props,
                false,
                Arc::new(Doubler),
            )),
        );

        let (broker, jobs) = JobBroker::new(BrokerConfig::default());
        let broker = Arc::new(broker);
        let services = Arc::new(EngineServices::in_memory());
        let worker = tokio::spawn(run_worker(
            jobs,
            broker.clone(),
            registry,
            services,
        ));

        let mut input = InputBag::new();
        input.insert("amount".to_string(), json!("21"));

        let response = broker
            .submit_and_wait(JobSubmission {
                job_type: WorkerJobType::ExecutePieceAction,
                platform_id: "platform-1".to_string(),
                project_id: "project-1".to_string(),
                piece_name: "@flowdeck/piece-pay".to_string(),
                piece_version: "1.0.0".to_string(),
                action_name: "double".to_string(),
                input,
            })
            .await
            .unwrap();

        assert_eq!(response.status, EngineResponseStatus::Ok);
        assert!(response.response.success);
        assert_eq!(response.response.output, json!(42));

        worker.abort();
    }
}
