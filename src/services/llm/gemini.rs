use super::{status_error, LlmClient};
use crate::core::error::{GenerationError, Result};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use url::Url;

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug)]
pub struct GeminiClient {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> Result<Url> {
        Url::parse_with_params(
            &format!("{}/{}:generateContent", BASE_URL, self.model),
            &[("key", self.api_key.as_str())],
        )
        .map_err(|e| GenerationError::InvalidConfiguration(format!("Invalid Gemini model name: {}", e)))
    }
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiSystemInstruction>,
}

#[derive(Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiSystemInstruction {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    error: Option<GeminiError>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentResponse>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Deserialize)]
struct GeminiPartResponse {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize, Debug)]
struct GeminiError {
    #[serde(default)]
    code: Option<u16>,
    message: String,
}

fn extract_text(body: &str) -> Result<String> {
    let result: GeminiResponse = serde_json::from_str(body).map_err(|e| {
        GenerationError::MalformedResponse(format!("Failed to parse Gemini response: {}", e))
    })?;

    if let Some(err) = result.error {
        return Err(match err.code {
            Some(code) => GenerationError::from_status(code, err.message),
            None => GenerationError::BackendGeneric(err.message),
        });
    }

    let first = result
        .candidates
        .as_deref()
        .and_then(|c| c.first())
        .ok_or_else(|| GenerationError::MalformedResponse("Gemini returned no candidates".to_string()))?;

    let text: String = first
        .content
        .as_ref()
        .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = first.finish_reason.as_deref().unwrap_or("UNKNOWN");
        return Err(GenerationError::MalformedResponse(format!(
            "Gemini response empty. Finish reason: {}",
            reason
        )));
    }
    Ok(text)
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String> {
        let url = self.endpoint()?;

        let request_body = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart { text: prompt.to_string() }],
            }],
            system_instruction: Some(GeminiSystemInstruction {
                parts: vec![GeminiPart { text: system.to_string() }],
            }),
        };

        debug!("Gemini request to model {}", self.model);
        let resp = self.client.post(url).json(&request_body).send().await?;

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
    fn test_endpoint_escapes_key() {
        let client = GeminiClient::new("a&b=c", "gemini-2.5-flash");
        let url = client.endpoint().unwrap();
        assert_eq!(url.path(), "/v1beta/models/gemini-2.5-flash:generateContent");
        assert_eq!(url.query(), Some("key=a%26b%3Dc"));
    }

    #[test]
    fn test_gemini_response_parsing_success() {
        let json = r#"{
            "candidates": [
                {
                    "content": {
                        "parts": [ { "text": "[{\"title\": " }, { "text": "\"x\"}]" } ],
                        "role": "model"
                    },
                    "finishReason": "STOP",
                    "index": 0
                }
            ]
        }"#;
        assert_eq!(extract_text(json).unwrap(), "[{\"title\": \"x\"}]");
    }

    #[test]
    fn test_gemini_response_parsing_safety_block() {
        let json = r#"{ "candidates": [ { "finishReason": "SAFETY", "index": 0 } ] }"#;
        let err = extract_text(json).unwrap_err();
        assert!(matches!(err, GenerationError::MalformedResponse(ref m) if m.contains("SAFETY")));
    }

    #[test]
    fn test_gemini_response_parsing_empty_content() {
        let json = r#"{ "candidates": [ { "content": { "role": "model" }, "finishReason": "STOP" } ] }"#;
        assert!(matches!(extract_text(json), Err(GenerationError::MalformedResponse(_))));
    }

    #[test]
    fn test_gemini_error_envelope() {
        let json = r#"{ "error": { "code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED" } }"#;
        assert_eq!(
            extract_text(json).unwrap_err(),
            GenerationError::BackendAuth("API key not valid".to_string())
        );
    }
}
