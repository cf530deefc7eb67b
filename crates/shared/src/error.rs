use serde::{Deserialize, Serialize};

/// Error body the content API attaches to non-2xx responses.
///
/// Every field is optional: bodies are decoded defensively and a missing or
/// malformed `error` falls back to a status-derived message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiErrorBody {
    /// Decodes `bytes` and returns the `error` text when present and non-blank.
    pub fn message_from_bytes(bytes: &[u8]) -> Option<String> {
        let body: Self = serde_json::from_slice(bytes).ok()?;
        body.error
            .map(|message| message.trim().to_string())
            .filter(|message| !message.is_empty())
    }
}
