use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use persona_core::completion::{CompletionService, ImageTextExtractor};
use persona_engine::ConversationEngine;

use crate::extract;
use crate::handlers;

/// Server configuration.
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8000 }
    }
}

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ConversationEngine>,
    pub completion: Arc<dyn CompletionService>,
    pub extractor: Arc<dyn ImageTextExtractor>,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/converse", post(handlers::converse))
        .route("/health", get(handlers::health))
        .route("/extract-text-from-image", post(extract::extract_text_from_image))
        .route("/extract_text_from_pdf", post(extract::extract_text_from_pdf))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Create and start the server. Returns a handle that keeps it alive.
pub async fn start(config: ServerConfig, state: AppState) -> Result<ServerHandle, std::io::Error> {
    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(port = local_addr.port(), "persona server started");

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        _server: server_handle,
    })
}

/// Handle returned by `start()` — keeps the accept loop alive.
pub struct ServerHandle {
    pub port: u16,
    _server: tokio::task::JoinHandle<()>,
}

#[cfg(test)]
mod tests {
    use super::*;

    use persona_engine::{ConversationEngine, EngineConfig, Profile};
    use persona_llm::{MockCompletion, MockExtractor};
    use persona_store::{CheckpointRepo, Database};

    fn state_with(completion: MockCompletion) -> AppState {
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
                text: "RECEIPT: 3 apples".into(),
            }),
        }
    }

    async fn started(completion: MockCompletion) -> ServerHandle {
        start(ServerConfig { port: 0 }, state_with(completion))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn serves_health() {
        let handle = started(MockCompletion::texts(&[])).await;
        let url = format!("http://127.0.0.1:{}/health", handle.port);

        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn converse_round_trip() {
        let handle = started(MockCompletion::texts(&["Hello there!"])).await;
        let url = format!("http://127.0.0.1:{}/converse", handle.port);

        let resp = reqwest::Client::new()
            .post(&url)
            .json(&serde_json::json!({"user_text": "hi", "user_id": 12}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["response"], "Hello there!");
    }

    #[tokio::test]
    async fn converse_failure_maps_to_500_detail() {
        let handle = started(MockCompletion::new(vec![Err(
            persona_core::errors::CompletionError::RateLimited,
        )]))
        .await;
        let url = format!("http://127.0.0.1:{}/converse", handle.port);

        let resp = reqwest::Client::new()
            .post(&url)
            .json(&serde_json::json!({"user_text": "hi", "user_id": 12}))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 500);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["detail"], "Failed to process the request.");
    }

    #[tokio::test]
    async fn image_extraction_round_trip() {
        let handle = started(MockCompletion::texts(&[])).await;
        let url = format!("http://127.0.0.1:{}/extract-text-from-image", handle.port);

        let part = reqwest::multipart::Part::bytes(vec![0xFF, 0xD8, 0xFF])
            .file_name("receipt.jpg")
            .mime_str("image/jpeg")
            .unwrap();
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = reqwest::Client::new()
            .post(&url)
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["extracted_text"], "RECEIPT: 3 apples");
    }

    #[tokio::test]
    async fn pdf_endpoint_rejects_non_pdf_uploads() {
        let handle = started(MockCompletion::texts(&[])).await;
        let url = format!("http://127.0.0.1:{}/extract_text_from_pdf", handle.port);

        let part = reqwest::multipart::Part::bytes(b"not a pdf".to_vec())
            .file_name("notes.txt")
            .mime_str("text/plain")
            .unwrap();
        let form = reqwest::multipart::Form::new().part("pdf", part);

        let resp = reqwest::Client::new()
            .post(&url)
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["detail"], "Uploaded file is not a PDF.");
    }
}
