//! Completion-service implementations: the Groq chat-completions provider
//! and a scripted mock for deterministic tests.

pub mod mock;
pub mod provider;
pub mod wire;

pub use mock::{MockCompletion, MockExtractor};
pub use provider::GroqProvider;
