use async_trait::async_trait;

use crate::errors::CompletionError;
use crate::messages::{AssistantMessage, Message};
use crate::tools::ToolDefinition;

/// A single completion request: system instructions, running history, and
/// the tool definitions the model may select from.
#[derive(Clone, Debug)]
pub struct CompletionRequest {
    pub system: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            system: system.into(),
            messages,
            tools: Vec::new(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// The completion-service boundary. The response is either a final textual
/// answer or an answer carrying requested tool calls; any hosted model API
/// satisfying this shape is substitutable.
#[async_trait]
pub trait CompletionService: Send + Sync {
    fn name(&self) -> &str;
    fn model(&self) -> &str;

    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<AssistantMessage, CompletionError>;
}

/// File-to-text extraction over a vision-capable model.
#[async_trait]
pub trait ImageTextExtractor: Send + Sync {
    async fn extract_text(
        &self,
        mime_type: &str,
        data_base64: &str,
    ) -> Result<String, CompletionError>;
}
