use axum::extract::{Multipart, State};
use axum::Json;
use base64::Engine as _;
use bytes::Bytes;
use serde_json::{json, Value};
use tracing::{info, warn};

use persona_core::completion::CompletionRequest;
use persona_core::messages::Message;

use crate::error::ApiError;
use crate::server::AppState;

/// Maximum upload size in bytes (20 MB).
const MAX_UPLOAD_SIZE: usize = 20 * 1024 * 1024;

const PDF_STRUCTURE_PROMPT: &str = "You are a document parser. Convert the following document text into a single JSON object capturing its fields and values. Respond with JSON only, no commentary.";

struct Upload {
    filename: Option<String>,
    mime_type: Option<String>,
    data: Bytes,
}

/// Pull the first file field out of a multipart request.
async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart request: {e}")))?
    {
        if field.file_name().is_none() && field.name().is_none() {
            continue;
        }
        let filename = field.file_name().map(str::to_owned);
        let mime_type = field.content_type().map(str::to_owned);
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Error reading upload: {e}")))?;

        if data.len() > MAX_UPLOAD_SIZE {
            return Err(ApiError::BadRequest("Uploaded file is too large.".into()));
        }
        return Ok(Upload {
            filename,
            mime_type,
            data,
        });
    }

    Err(ApiError::BadRequest("No file field in request.".into()))
}

/// `POST /extract-text-from-image` — verbatim text extraction through the
/// vision model.
pub async fn extract_text_from_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let upload = read_upload(multipart).await?;
    let mime_type = upload.mime_type.unwrap_or_else(|| "image/jpeg".to_string());
    let encoded = base64::engine::general_purpose::STANDARD.encode(&upload.data);

    info!(bytes = upload.data.len(), mime_type, "extracting text from image");

    let text = state
        .extractor
        .extract_text(&mime_type, &encoded)
        .await
        .map_err(|e| ApiError::Internal(format!("Error processing the image: {e}")))?;

    Ok(Json(json!({ "extracted_text": text })))
}

/// `POST /extract_text_from_pdf` — local text extraction plus a completion
/// pass that structures the text as JSON.
pub async fn extract_text_from_pdf(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let upload = read_upload(multipart).await?;
    let is_pdf = upload
        .filename
        .as_deref()
        .is_some_and(|name| name.ends_with(".pdf"));
    if !is_pdf {
        return Err(ApiError::BadRequest("Uploaded file is not a PDF.".into()));
    }

    let data = upload.data.to_vec();
    let extracted_text = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem(&data)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Error extracting text from PDF: {e}")))?
    .map_err(|e| ApiError::Internal(format!("Error extracting text from PDF: {e}")))?;

    let extracted_text = extracted_text.trim().to_string();
    let extracted_json_data = structure_as_json(&state, &extracted_text).await;

    Ok(Json(json!({
        "extracted_text": extracted_text,
        "extracted_json_data": extracted_json_data,
    })))
}

/// Ask the completion service to shape raw document text into JSON.
/// Degrades to null; extraction already succeeded on its own.
async fn structure_as_json(state: &AppState, text: &str) -> Value {
    if text.is_empty() {
        return Value::Null;
    }

    let request = CompletionRequest::new(PDF_STRUCTURE_PROMPT, vec![Message::user_text(text)])
        .with_temperature(0.0);

    match state.completion.complete(&request).await {
        Ok(response) => {
            let raw = strip_code_fences(&response.content);
            match serde_json::from_str(raw) {
                Ok(value) => value,
                Err(e) => {
                    warn!(error = %e, "structuring pass returned non-JSON");
                    Value::Null
                }
            }
        }
        Err(e) => {
            warn!(kind = e.error_kind(), error = %e, "structuring pass failed");
            Value::Null
        }
    }
}

fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix("```json").unwrap_or(trimmed);
    let trimmed = trimmed.strip_prefix("```").unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix("```").unwrap_or(trimmed);
    trimmed.trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use persona_engine::{ConversationEngine, EngineConfig, Profile};
    use persona_llm::{MockCompletion, MockExtractor};
    use persona_store::{CheckpointRepo, Database};

    fn app_state(completion: MockCompletion) -> AppState {
        let completion = Arc::new(completion);
        let registry = Arc::new(persona_engine::tools::create_default_registry(
            Arc::new(Profile::builtin()),
            false,
        ));
        let engine = ConversationEngine::new(
            completion.clone(),
            registry,
            CheckpointRepo::new(Database::in_memory().unwrap()),
            EngineConfig::default(),
        );
        AppState {
            engine: Arc::new(engine),
            completion,
            extractor: Arc::new(MockExtractor {
                text: "mock image text".into(),
            }),
        }
    }

    #[tokio::test]
    async fn structuring_parses_fenced_json() {
        let state = app_state(MockCompletion::texts(&[
            "```json\n{\"invoice\": 42}\n```",
        ]));
        let value = structure_as_json(&state, "Invoice #42").await;
        assert_eq!(value["invoice"], 42);
    }

    #[tokio::test]
    async fn structuring_degrades_to_null_on_non_json() {
        let state = app_state(MockCompletion::texts(&["it's an invoice, I think"]));
        assert_eq!(structure_as_json(&state, "Invoice #42").await, Value::Null);
    }

    #[tokio::test]
    async fn structuring_degrades_to_null_on_failure() {
        let state = app_state(MockCompletion::new(vec![Err(
            persona_core::errors::CompletionError::RateLimited,
        )]));
        assert_eq!(structure_as_json(&state, "Invoice #42").await, Value::Null);
    }

    #[tokio::test]
    async fn structuring_skips_empty_text() {
        let state = app_state(MockCompletion::texts(&["unused"]));
        assert_eq!(structure_as_json(&state, "").await, Value::Null);
    }
}
