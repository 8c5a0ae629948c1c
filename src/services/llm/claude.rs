use super::{status_error, LlmClient};
use crate::core::error::{GenerationError, Result};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

#[derive(Debug)]
pub struct ClaudeClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl ClaudeClient {
    pub fn new(api_key: &str, model: &str, base_url: Option<&str>) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url
                .unwrap_or("https://api.anthropic.com/v1")
                .trim_end_matches('/')
                .to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<ClaudeMessage>,
}

#[derive(Serialize)]
struct ClaudeMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ClaudeResponse {
    #[serde(default)]
    content: Vec<ClaudeBlock>,
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct ClaudeBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

fn extract_text(body: &str) -> Result<String> {
    let result: ClaudeResponse = serde_json::from_str(body).map_err(|e| {
        GenerationError::MalformedResponse(format!("Failed to parse Claude response: {}", e))
    })?;

    let text = result
        .content
        .iter()
        .find(|block| block.kind == "text")
        .map(|block| block.text.clone())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(GenerationError::MalformedResponse(format!(
            "Claude response empty. Stop reason: {}",
            result.stop_reason.as_deref().unwrap_or("UNKNOWN")
        )));
    }
    Ok(text)
}

#[async_trait]
impl LlmClient for ClaudeClient {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String> {
        let url = format!("{}/messages", self.base_url);

        let request_body = ClaudeRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            system: system.to_string(),
            messages: vec![ClaudeMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        debug!("Claude request to model {}", self.model);
        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request_body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(status_error(resp).await);
        }

        let body = resp.text().await?;
        extract_text(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claude_response_picks_text_block() {
        let json = r#"{
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "content": [
                { "type": "thinking", "thinking": "..." },
                { "type": "text", "text": "[{\"title\": \"야근\"}]" }
            ],
            "stop_reason": "end_turn"
        }"#;
        assert_eq!(extract_text(json).unwrap(), "[{\"title\": \"야근\"}]");
    }

    #[test]
    fn test_claude_response_without_text() {
        let json = r#"{ "content": [], "stop_reason": "max_tokens" }"#;
        let err = extract_text(json).unwrap_err();
        assert!(err.to_string().contains("max_tokens"));
    }

    #[test]
    fn test_claude_request_shape() {
        let body = serde_json::to_value(ClaudeRequest {
            model: "claude-haiku-4-5-20251001".to_string(),
            max_tokens: MAX_TOKENS,
            system: "sys".to_string(),
            messages: vec![ClaudeMessage { role: "user".to_string(), content: "hi".to_string() }],
        })
        .unwrap();
        assert_eq!(body["system"], "sys");
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["messages"][0]["role"], "user");
    }
}
