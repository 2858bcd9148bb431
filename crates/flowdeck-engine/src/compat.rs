//! Backward compatibility for older context shapes.
//!
//! Pieces built against an older context keep working on newer hosts: a
//! pure translation maps the current [`ActionContext`] to the shape that
//! piece generation expects, keyed by the piece's
//! [`ContextVersion`](flowdeck_pieces::ContextVersion) marker.

use std::sync::Arc;

use async_trait::async_trait;

use flowdeck_pieces::{
    ActionContext, AgentTool, AgentToolProvider, CapabilityError, ConnectionTarget, ContextVersion,
};

/// Map the current context into the shape a piece of the given context
/// version expects. Pure translation, no shared state.
pub fn adapt_for_version(ctx: ActionContext, version: ContextVersion) -> ActionContext {
    match version {
        ContextVersion::V2 => ctx,
        ContextVersion::V1 => ActionContext {
            // Direct execution used to resolve connections through the
            // trigger surface; v1 pieces were written against that and
            // predate agent tooling.
            connections: ctx.connections.retargeted(ConnectionTarget::Triggers),
            agent: Arc::new(PreAgentToolProvider),
            ..ctx
        },
    }
}

/// Tool provider shown to pieces that predate agent tooling.
struct PreAgentToolProvider;

#[async_trait]
impl AgentToolProvider for PreAgentToolProvider {
    async fn tools(
        &self,
        _model: &str,
        _names: &[String],
    ) -> Result<Vec<AgentTool>, CapabilityError> {
        Err(CapabilityError::Unavailable(
            "agent tools are not available to context v1 pieces".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context_builder::{ContextBuilder, ContextParams};
    use crate::services::EngineServices;
    use flowdeck_pieces::ProjectContext;
    use flowdeck_types::InputBag;

    fn context() -> ActionContext {
        let builder = ContextBuilder::new(Arc::new(EngineServices::in_memory()));
        builder.build(ContextParams {
            step_name: "send_message".to_string(),
            flow_id: "flow-1".to_string(),
            run_id: "run-1".to_string(),
            project: ProjectContext {
                id: "project-1".to_string(),
                external_id: None,
            },
            props_value: InputBag::new(),
            auth: None,
        })
    }

    #[tokio::test]
    async fn v2_context_is_unchanged() {
        let ctx = adapt_for_version(context(), ContextVersion::V2);
        assert_eq!(ctx.connections.target(), ConnectionTarget::Actions);
        assert!(ctx.agent.tools("gpt", &[]).await.is_ok());
    }

    #[tokio::test]
    async fn v1_context_gets_legacy_connection_target_and_no_agent_tools() {
        let ctx = adapt_for_version(context(), ContextVersion::V1);
        assert_eq!(ctx.connections.target(), ConnectionTarget::Triggers);
        assert!(matches!(
            ctx.agent.tools("gpt", &[]).await,
            Err(CapabilityError::Unavailable(_))
        ));
    }
}
