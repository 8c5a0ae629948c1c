use super::{status_error, LlmClient};
use crate::core::error::{GenerationError, Result};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug)]
pub struct OpenAIClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAIClient {
    pub fn new(api_key: &str, model: &str, base_url: Option<&str>) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url
                .unwrap_or("https://api.openai.com/v1")
                .trim_end_matches('/')
                .to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
}

#[derive(Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessageResponse,
}

#[derive(Deserialize)]
struct OpenAIMessageResponse {
    content: Option<String>,
}

fn extract_text(body: &str) -> Result<String> {
    let result: OpenAIResponse = serde_json::from_str(body).map_err(|e| {
        GenerationError::MalformedResponse(format!("Failed to parse OpenAI response: {}", e))
    })?;
    result
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| GenerationError::MalformedResponse("OpenAI response empty or missing content".to_string()))
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let request_body = OpenAIRequest {
            model: self.model.clone(),
            messages: vec![
                OpenAIMessage { role: "system".to_string(), content: system.to_string() },
                OpenAIMessage { role: "user".to_string(), content: prompt.to_string() },
            ],
        };

        debug!("OpenAI request to {} ({})", url, self.model);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
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
