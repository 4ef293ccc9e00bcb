//! Core types for the persona chatbot backend: branded ids, messages,
//! conversation state, and the traits at the completion/tool seams.

pub mod completion;
pub mod errors;
pub mod ids;
pub mod messages;
pub mod security;
pub mod state;
pub mod tools;
