use std::sync::Arc;

use tracing::instrument;

use persona_core::completion::{CompletionRequest, CompletionService};
use persona_core::messages::{AssistantMessage, Message};
use persona_core::state::ConversationState;
use persona_core::tools::ToolDefinition;

use crate::error::EngineError;
use crate::prompts;

/// The primary assistant node: formats the running state into a completion
/// request and merges the response back into the history. No retries — a
/// completion failure ends the turn.
pub struct Assistant {
    completion: Arc<dyn CompletionService>,
    system_prompt: String,
    tool_definitions: Vec<ToolDefinition>,
    temperature: f64,
}

impl Assistant {
    pub fn new(completion: Arc<dyn CompletionService>, tool_definitions: Vec<ToolDefinition>) -> Self {
        Self {
            completion,
            system_prompt: prompts::primary_assistant_prompt(),
            tool_definitions,
            temperature: 0.0,
        }
    }

    /// One assistant step. The response — answer or tool-call request — is
    /// merged into the state and also returned for routing.
    #[instrument(skip(self, state), fields(history = state.messages.len()))]
    pub async fn step(
        &self,
        state: &mut ConversationState,
    ) -> Result<AssistantMessage, EngineError> {
        let request = CompletionRequest::new(&self.system_prompt, state.messages.clone())
            .with_tools(self.tool_definitions.clone())
            .with_temperature(self.temperature);

        let response = self.completion.complete(&request).await?;
        state.merge(vec![Message::Assistant(response.clone())]);
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use persona_llm::MockCompletion;

    #[tokio::test]
    async fn step_merges_response_into_state() {
        let assistant = Assistant::new(Arc::new(MockCompletion::texts(&["hello back"])), vec![]);
        let mut state = ConversationState::default();
        state.merge(vec![Message::user_text("hello")]);

        let response = assistant.step(&mut state).await.unwrap();
        assert_eq!(response.content, "hello back");
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[1].content(), "hello back");
        assert!(state.messages[1].id().is_some());
    }

    #[tokio::test]
    async fn completion_failure_propagates() {
        let assistant = Assistant::new(
            Arc::new(MockCompletion::new(vec![Err(
                persona_core::errors::CompletionError::RateLimited,
            )])),
            vec![],
        );
        let mut state = ConversationState::default();
        state.merge(vec![Message::user_text("hello")]);

        let err = assistant.step(&mut state).await.unwrap_err();
        assert!(matches!(err, EngineError::Completion(_)));
        // The failed step leaves no assistant message behind.
        assert_eq!(state.messages.len(), 1);
    }
}
