use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde_json::json;
use tracing::instrument;

use persona_core::completion::{CompletionRequest, CompletionService, ImageTextExtractor};
use persona_core::errors::CompletionError;
use persona_core::messages::AssistantMessage;
use persona_core::security::ApiKey;

use crate::wire;

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const VISION_MODEL: &str = "llama-3.2-90b-vision-preview";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
// The upstream contract defines no timeout; every remote call here is
// bounded as a correctness improvement.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const IMAGE_EXTRACTION_PROMPT: &str = "Extract the text from the provided image exactly as it appears without answering any questions or interpreting the content. Your task is to simply return the extracted text as-is.";

/// Completion provider for the Groq OpenAI-compatible chat-completions API.
pub struct GroqProvider {
    client: Client,
    api_key: ApiKey,
    base_url: String,
    model: String,
}

impl GroqProvider {
    pub fn new(api_key: ApiKey, model: Option<&str>) -> Self {
        Self {
            client: Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("failed to build HTTP client"),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.unwrap_or(DEFAULT_MODEL).to_string(),
        }
    }

    /// Point the provider at a different OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn post_chat(
        &self,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, CompletionError> {
        let url = format!("{}/chat/completions", self.base_url);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.0.expose_secret())
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::Timeout(e.to_string())
                } else {
                    CompletionError::NetworkError(e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(CompletionError::from_status(status, body));
        }

        resp.json()
            .await
            .map_err(|e| CompletionError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl CompletionService for GroqProvider {
    fn name(&self) -> &str {
        "groq"
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> Result<AssistantMessage, CompletionError> {
        let body = wire::build_request_body(request, &self.model);
        let resp = self.post_chat(body).await?;
        wire::parse_response_body(&resp)
    }
}

#[async_trait]
impl ImageTextExtractor for GroqProvider {
    #[instrument(skip(self, data_base64))]
    async fn extract_text(
        &self,
        mime_type: &str,
        data_base64: &str,
    ) -> Result<String, CompletionError> {
        let body = json!({
            "model": VISION_MODEL,
            "messages": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": IMAGE_EXTRACTION_PROMPT},
                    {"type": "image_url", "image_url": {
                        "url": format!("data:{mime_type};base64,{data_base64}"),
                    }},
                ],
            }],
        });

        let resp = self.post_chat(body).await?;
        let message = wire::parse_response_body(&resp)?;
        Ok(message.content)
    }
}
