//! HTTP surface for the persona backend: the converse endpoint, health
//! check, and the image/PDF text-extraction endpoints.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use server::{build_router, start, AppState, ServerConfig, ServerHandle};
