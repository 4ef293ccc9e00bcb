use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use persona_core::completion::{CompletionRequest, CompletionService, ImageTextExtractor};
use persona_core::errors::CompletionError;
use persona_core::messages::{AssistantMessage, ToolCallBlock};

/// Scripted completion service: returns pre-programmed responses in order,
/// for deterministic engine and handler tests without API calls.
pub struct MockCompletion {
    responses: Mutex<VecDeque<Result<AssistantMessage, CompletionError>>>,
    call_count: AtomicUsize,
}

impl MockCompletion {
    pub fn new(responses: Vec<Result<AssistantMessage, CompletionError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            call_count: AtomicUsize::new(0),
        }
    }

    /// Convenience: a sequence of plain text answers.
    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(AssistantMessage::text(*t))).collect())
    }

    /// Convenience: one tool-call response followed by a final answer.
    pub fn tool_call_then_text(tool_calls: Vec<ToolCallBlock>, text: &str) -> Self {
        Self::new(vec![
            Ok(AssistantMessage::with_tool_calls("", tool_calls)),
            Ok(AssistantMessage::text(text)),
        ])
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl CompletionService for MockCompletion {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(
        &self,
        _request: &CompletionRequest,
    ) -> Result<AssistantMessage, CompletionError> {
        let idx = self.call_count.fetch_add(1, Ordering::Relaxed);
        self.responses.lock().pop_front().ok_or_else(|| {
            CompletionError::InvalidRequest(format!("MockCompletion: no response for call {idx}"))
        })?
    }
}

/// Scripted image-text extractor.
pub struct MockExtractor {
    pub text: String,
}

#[async_trait]
impl ImageTextExtractor for MockExtractor {
    async fn extract_text(
        &self,
        _mime_type: &str,
        _data_base64: &str,
    ) -> Result<String, CompletionError> {
        Ok(self.text.clone())
    }
}
