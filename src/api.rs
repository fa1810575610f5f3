use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";

pub const MIN_TOP_K: u8 = 1;
pub const MAX_TOP_K: u8 = 10;
pub const DEFAULT_TOP_K: u8 = 3;

/// Response detail level understood by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Beginner,
    Intermediate,
    Expert,
}

impl Level {
    pub fn all() -> &'static [Level] {
        &[Level::Beginner, Level::Intermediate, Level::Expert]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Level::Beginner => "Beginner",
            Level::Intermediate => "Intermediate",
            Level::Expert => "Expert",
        }
    }

    pub fn from_str(s: &str) -> Option<Level> {
        match s.to_lowercase().as_str() {
            "beginner" => Some(Level::Beginner),
            "intermediate" => Some(Level::Intermediate),
            "expert" => Some(Level::Expert),
            _ => None,
        }
    }

    pub fn next(&self) -> Level {
        match self {
            Level::Beginner => Level::Intermediate,
            Level::Intermediate => Level::Expert,
            Level::Expert => Level::Beginner,
        }
    }

    pub fn prev(&self) -> Level {
        match self {
            Level::Beginner => Level::Expert,
            Level::Intermediate => Level::Beginner,
            Level::Expert => Level::Intermediate,
        }
    }
}

/// Clamp a requested retrieval count to the range the backend accepts.
pub fn clamp_top_k(value: u8) -> u8 {
    value.clamp(MIN_TOP_K, MAX_TOP_K)
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub query: String,
    pub level: Level,
    pub top_k: u8,
}

/// Body of a chat reply. The backend reports failures through the `error`
/// field, sometimes alongside HTTP 200, so both fields are optional and the
/// caller classifies. Echoed request fields (`level`, `top_k`) are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub gemini_api_key_set: bool,
}

#[derive(Clone)]
pub struct DocubotClient {
    client: Client,
    base_url: String,
}

impl DocubotClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask the backend a question. The body is parsed regardless of HTTP
    /// status: a non-2xx reply still carries a structured `error` field.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/api/chat", self.base_url);

        let response = self.client.post(&url).json(request).send().await?;

        let status = response.status();
        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| anyhow!("invalid reply from server (HTTP {}): {}", status, e))?;

        Ok(reply)
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let url = format!("{}/api/health", self.base_url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "health check failed with status: {}",
                response.status()
            ));
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_serializes_level_lowercase() {
        let request = ChatRequest {
            query: "What is Ceph?".to_string(),
            level: Level::Intermediate,
            top_k: 5,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["query"], "What is Ceph?");
        assert_eq!(json["level"], "intermediate");
        assert_eq!(json["top_k"], 5);
    }

    #[test]
    fn test_chat_response_ignores_echoed_fields() {
        let reply: ChatResponse =
            serde_json::from_str(r#"{"response": "hi", "level": "beginner", "top_k": 3}"#).unwrap();
        assert_eq!(reply.response.as_deref(), Some("hi"));
        assert!(reply.error.is_none());
    }

    #[test]
    fn test_chat_response_tolerates_missing_fields() {
        let reply: ChatResponse = serde_json::from_str("{}").unwrap();
        assert!(reply.response.is_none());
        assert!(reply.error.is_none());
    }

    #[test]
    fn test_health_response_defaults_to_key_missing() {
        let health: HealthResponse = serde_json::from_str(r#"{"status": "ok"}"#).unwrap();
        assert!(!health.gemini_api_key_set);
    }

    #[test]
    fn test_level_from_str_is_case_insensitive() {
        assert_eq!(Level::from_str("Expert"), Some(Level::Expert));
        assert_eq!(Level::from_str("BEGINNER"), Some(Level::Beginner));
        assert_eq!(Level::from_str("guru"), None);
    }

    #[test]
    fn test_level_cycle_wraps_around() {
        assert_eq!(Level::Expert.next(), Level::Beginner);
        assert_eq!(Level::Beginner.prev(), Level::Expert);
    }

    #[test]
    fn test_clamp_top_k_bounds() {
        assert_eq!(clamp_top_k(0), 1);
        assert_eq!(clamp_top_k(3), 3);
        assert_eq!(clamp_top_k(42), 10);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = DocubotClient::new("http://localhost:5000/");
        assert_eq!(client.base_url(), "http://localhost:5000");
    }
}
