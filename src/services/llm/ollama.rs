use super::{status_error, LlmClient};
use crate::core::error::{GenerationError, Result};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug)]
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
}

#[derive(Serialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OllamaResponse {
    message: OllamaMessageResponse,
}

#[derive(Deserialize)]
struct OllamaMessageResponse {
    content: String,
}

fn extract_text(body: &str) -> Result<String> {
    let result: OllamaResponse = serde_json::from_str(body).map_err(|e| {
        GenerationError::MalformedResponse(format!("Failed to parse Ollama response: {}", e))
    })?;
    if result.message.content.trim().is_empty() {
        return Err(GenerationError::MalformedResponse("Ollama response empty".to_string()));
    }
    Ok(result.message.content)
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url);

        let request_body = OllamaRequest {
            model: self.model.clone(),
            messages: vec![
                OllamaMessage { role: "system".to_string(), content: system.to_string() },
                OllamaMessage { role: "user".to_string(), content: prompt.to_string() },
            ],
            stream: false,
        };

        debug!("Ollama request to {} ({})", url, self.model);
        let resp = self.client.post(&url).json(&request_body).send().await?;

        if !resp.status().is_success() {
            return Err(status_error(resp).await);
        }

        let body = resp.text().await?;
        extract_text(&body)
    }
}
