use async_trait::async_trait;
use tracing::error;

use persona_core::completion::CompletionRequest;
use persona_core::messages::Message;
use persona_core::tools::{Tool, ToolContext, ToolError, ToolResult};

use crate::prompts::{RESTRICTED_INSTRUCTIONS, UNRESTRICTED_INSTRUCTIONS};

/// Fixed user-safe text returned when the nested completion call fails.
pub const FAILURE_TEXT: &str = "Failed to answer Open Ended user query";

/// Answers open-world / general-knowledge questions through a nested
/// completion call. Failures are swallowed into [`FAILURE_TEXT`] so they
/// stay inside the conversation.
pub struct OpenWorldTool {
    restrict_open_ended: bool,
}

impl OpenWorldTool {
    pub fn new(restrict_open_ended: bool) -> Self {
        Self { restrict_open_ended }
    }
}

#[async_trait]
impl Tool for OpenWorldTool {
    fn name(&self) -> &str {
        "handle_open_world_question"
    }

    fn description(&self) -> &str {
        "Handles open-world questions and general knowledge questions asked by the user. \
         Analyzes the user query, determines the type of question, and generates an appropriate response. \
         Examples: \"What is speed of light?\", \"Explain the theory of relativity.\", \
         \"Write me an essay\", \"How to cook ...\""
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "required": ["user_query"],
            "properties": {
                "user_query": {
                    "type": "string",
                    "description": "The question or query input by the user"
                }
            }
        })
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let user_query = args["user_query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("user_query is required".into()))?;

        let instructions = if self.restrict_open_ended {
            RESTRICTED_INSTRUCTIONS
        } else {
            UNRESTRICTED_INSTRUCTIONS
        };
        let system = format!("{instructions}\nCurrent user query: {user_query}.");

        let request = CompletionRequest::new(system, vec![Message::user_text(user_query)])
            .with_temperature(0.0);

        match ctx.completion.complete(&request).await {
            Ok(response) => Ok(ToolResult::text(response.content)),
            Err(e) => {
                error!(kind = e.error_kind(), error = %e, "failed to answer open-ended query");
                Ok(ToolResult::error(FAILURE_TEXT))
            }
        }
    }
}
