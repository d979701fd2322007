//! Wire models
//!
//! Chat-completion types exchanged with the upstream, plus the DTOs used by
//! the HTTP surface.

pub mod chat;
pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use chat::{upstream_error_message, ChatCompletion, ChatMessage, ChatPayload};
pub use requests::GenerateRequest;
pub use responses::{GenerateResponse, HealthResponse};
