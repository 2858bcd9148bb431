//! The action runner.

use std::sync::Arc;

use tracing::{debug, warn};

use flowdeck_pieces::{ActionContext, PieceAction};
use flowdeck_types::ExecutionOutcome;

/// Invoke an action's entry point exactly once with the built context.
///
/// Always returns: an `Err` from the handler becomes
/// [`ExecutionOutcome::Failure`] carrying its message, and a panicking
/// handler is contained in its own task rather than taking down the
/// host. No retries happen here; retry policy belongs to the caller.
pub async fn run_action(action: Arc<PieceAction>, ctx: ActionContext) -> ExecutionOutcome {
    let action_name = action.name.clone();
    debug!(action = %action_name, run_id = %ctx.run_id, "running action");

    let handle = tokio::spawn(async move { action.handler.run(ctx).await });

    match handle.await {
        Ok(Ok(output)) => ExecutionOutcome::Success { output },
        Ok(Err(fault)) => {
            debug!(action = %action_name, error = %fault, "action failed");
            ExecutionOutcome::Failure {
                message: fault.to_string(),
            }
        }
        Err(join_error) => {
            warn!(action = %action_name, "action panicked");
            ExecutionOutcome::Failure {
                message: panic_message(join_error),
            }
        }
    }
}

fn panic_message(join_error: tokio::task::JoinError) -> String {
    match join_error.try_into_panic() {
        Ok(payload) => {
            if let Some(s) = payload.downcast_ref::<&str>() {
                (*s).to_string()
            } else if let Some(s) = payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "action panicked".to_string()
            }
        }
        Err(e) => e.to_string(),
    }
}
