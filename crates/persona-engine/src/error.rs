use persona_core::errors::CompletionError;
use persona_store::StoreError;

use crate::router::RouteError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("completion error: {0}")]
    Completion(#[from] CompletionError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("routing error: {0}")]
    Route(#[from] RouteError),

    #[error("unknown tool requested: {0}")]
    UnknownTool(String),

    #[error("max steps exceeded: {0}")]
    MaxStepsExceeded(u32),
}
