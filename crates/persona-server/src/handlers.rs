use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use persona_core::ids::ThreadId;
use persona_engine::TurnRequest;

use crate::error::ApiError;
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct ConverseRequest {
    pub user_text: String,
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct ConverseResponse {
    pub response: String,
}

/// `POST /converse` — run one turn through the graph.
pub async fn converse(
    State(state): State<AppState>,
    Json(request): Json<ConverseRequest>,
) -> Result<Json<ConverseResponse>, ApiError> {
    info!(user_id = request.user_id, "user question: {}", request.user_text);

    let turn = TurnRequest {
        thread_id: ThreadId::for_user(request.user_id),
        user_id: request.user_id,
        user_text: request.user_text,
    };

    match state.engine.converse(&turn).await {
        Ok(response) => {
            info!(user_id = request.user_id, "turn finished");
            Ok(Json(ConverseResponse { response }))
        }
        Err(e) => {
            error!(user_id = request.user_id, error = %e, "turn failed");
            Err(ApiError::Internal("Failed to process the request.".into()))
        }
    }
}

/// `GET /health` — basic liveness check.
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}
