//! Chat-completion wire types exchanged with the upstream service.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One message in the conversation sent upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// Request body for the chat-completion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatPayload {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Successful upstream response. Unknown fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletion {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: String,
}

impl ChatCompletion {
    /// Trimmed content of the first choice.
    pub fn reply(&self) -> Result<String> {
        self.choices
            .first()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or_else(|| Error::InvalidResponse("no choices in upstream response".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Human-readable message for a non-200 upstream body.
///
/// Uses `{"error": {"message": ...}}` when present, otherwise the status and
/// the first 200 characters of the raw body.
pub fn upstream_error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) => {
            let preview: String = body.chars().take(200).collect();
            format!("{} - {}", status, preview)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_serializes_expected_fields() {
        let payload = ChatPayload {
            messages: vec![ChatMessage::system("be brief"), ChatMessage::user("hi")],
            model: "llama3-8b-8192".to_string(),
            temperature: 0.5,
            max_tokens: 100,
        };
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert_eq!(json["model"], "llama3-8b-8192");
        assert_eq!(json["temperature"], 0.5);
        assert_eq!(json["max_tokens"], 100);
    }

    #[test]
    fn test_reply_takes_first_choice_trimmed() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"  Thanks!\n"}}],"usage":{}}"#;
        let completion: ChatCompletion = serde_json::from_str(body).unwrap();
        assert_eq!(completion.reply().unwrap(), "Thanks!");
    }

    #[test]
    fn test_reply_without_choices_is_invalid() {
        let completion: ChatCompletion = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(completion.reply(), Err(Error::InvalidResponse(_))));
    }

    #[test]
    fn test_error_message_from_envelope() {
        let body = r#"{"error":{"message":"Invalid API Key","type":"invalid_request_error"}}"#;
        assert_eq!(upstream_error_message(401, body), "Invalid API Key");
    }

    #[test]
    fn test_error_message_fallback_truncates() {
        let body = "x".repeat(500);
        let message = upstream_error_message(502, &body);
        assert!(message.starts_with("502 - "));
        assert_eq!(message.len(), "502 - ".len() + 200);
    }
}
