//! Request DTOs for the HTTP surface
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

use crate::models::ChatMessage;

/// Request body for POST /generate
///
/// Messages arrive fully built; prompt templating happens upstream of this
/// service. Generation parameters fall back to configured defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Rate-limit identity; the peer address is used when absent
    #[serde(default)]
    pub client_id: Option<String>,
}

impl GenerateRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.messages.is_empty() {
            return Some("Messages cannot be empty".to_string());
        }
        if self.messages.iter().all(|m| m.content.trim().is_empty()) {
            return Some("Prompt cannot be empty".to_string());
        }
        None
    }
}
