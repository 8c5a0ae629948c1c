use crate::core::error::{GenerationError, Result};
use crate::services::dispatch::RetryPolicy;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::time::Duration;

mod claude;
mod gemini;
mod ollama;
mod openai;

pub use claude::ClaudeClient;
pub use gemini::GeminiClient;
pub use ollama::OllamaClient;
pub use openai::OpenAIClient;

/// One text-generation backend. Dropping the returned future aborts the request.
#[async_trait]
pub trait LlmClient: Send + Sync + Debug {
    async fn generate(&self, system: &str, prompt: &str) -> Result<String>;
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LlmConfig {
    pub provider: String,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: u32,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_parse_retry_count")]
    pub parse_retry_count: u32,
    #[serde(default = "default_duplicate_threshold")]
    pub duplicate_threshold: f64,
    pub gemini: Option<GeminiConfig>,
    pub openai: Option<OpenAIConfig>,
    pub claude: Option<ClaudeConfig>,
    pub ollama: Option<OllamaConfig>,
}

fn default_retry_count() -> u32 {
    2
}
fn default_retry_delay_ms() -> u64 {
    1_000
}
fn default_backoff_factor() -> u32 {
    2
}
fn default_timeout_seconds() -> u64 {
    60
}
fn default_parse_retry_count() -> u32 {
    1
}
fn default_duplicate_threshold() -> f64 {
    0.78
}

impl LlmConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry_count,
            initial_backoff: Duration::from_millis(self.retry_delay_ms),
            backoff_factor: self.backoff_factor.max(1),
            timeout: Duration::from_secs(self.timeout_seconds.max(1)),
            parse_retries: self.parse_retry_count,
            duplicate_threshold: self.duplicate_threshold,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OpenAIConfig {
    pub api_key: String,
    #[serde(default = "default_openai_model")]
    pub model: String,
    pub base_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClaudeConfig {
    pub api_key: String,
    #[serde(default = "default_claude_model")]
    pub model: String,
    pub base_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    pub model: String,
}

fn default_gemini_model() -> String {
    "gemini-2.5-pro-preview-06-05".to_string()
}
fn default_openai_model() -> String {
    "gpt-5.2".to_string()
}
fn default_claude_model() -> String {
    "claude-sonnet-4-5-20250929".to_string()
}
fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

pub fn create_llm(config: &LlmConfig) -> Result<Box<dyn LlmClient>> {
    let missing = |name: &str| GenerationError::InvalidConfiguration(format!("{} config missing", name));
    match config.provider.as_str() {
        "gemini" => {
            let cfg = config.gemini.as_ref().ok_or_else(|| missing("Gemini"))?;
            create_client("gemini", &cfg.api_key, &cfg.model, None)
        }
        "openai" => {
            let cfg = config.openai.as_ref().ok_or_else(|| missing("OpenAI"))?;
            create_client("openai", &cfg.api_key, &cfg.model, cfg.base_url.as_deref())
        }
        "claude" => {
            let cfg = config.claude.as_ref().ok_or_else(|| missing("Claude"))?;
            create_client("claude", &cfg.api_key, &cfg.model, cfg.base_url.as_deref())
        }
        "ollama" => {
            let cfg = config.ollama.as_ref().ok_or_else(|| missing("Ollama"))?;
            create_client("ollama", "", &cfg.model, Some(&cfg.base_url))
        }
        other => Err(GenerationError::InvalidConfiguration(format!(
            "Unknown LLM provider: {}",
            other
        ))),
    }
}

/// Builds a client from loose parts. An empty model falls back to the vendor default.
pub fn create_client(
    provider: &str,
    api_key: &str,
    model: &str,
    base_url: Option<&str>,
) -> Result<Box<dyn LlmClient>> {
    let pick = |default: fn() -> String| {
        if model.trim().is_empty() {
            default()
        } else {
            model.trim().to_string()
        }
    };
    let require_key = || {
        if api_key.trim().is_empty() {
            Err(GenerationError::InvalidConfiguration(format!(
                "{} API key is empty",
                provider
            )))
        } else {
            Ok(api_key.trim())
        }
    };

    match provider {
        "gemini" => Ok(Box::new(GeminiClient::new(require_key()?, &pick(default_gemini_model)))),
        "openai" => Ok(Box::new(OpenAIClient::new(
            require_key()?,
            &pick(default_openai_model),
            base_url,
        ))),
        "claude" => Ok(Box::new(ClaudeClient::new(
            require_key()?,
            &pick(default_claude_model),
            base_url,
        ))),
        "ollama" => {
            if model.trim().is_empty() {
                return Err(GenerationError::InvalidConfiguration(
                    "Ollama model is empty".to_string(),
                ));
            }
            let url = base_url.map(str::to_string).unwrap_or_else(default_ollama_url);
            Ok(Box::new(OllamaClient::new(&url, model.trim())))
        }
        other => Err(GenerationError::InvalidConfiguration(format!(
            "Unknown LLM provider: {}",
            other
        ))),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorEnvelope {
    Nested { error: ErrorDetail },
    Flat { error: String },
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Pulls the vendor's own message out of an error body, falling back to the raw text.
pub(crate) fn vendor_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope::Nested { error }) => error.message,
        Ok(ErrorEnvelope::Flat { error }) => error,
        Err(_) => {
            let trimmed = body.trim();
            if trimmed.chars().count() > 300 {
                format!("{}...", trimmed.chars().take(300).collect::<String>())
            } else {
                trimmed.to_string()
            }
        }
    }
}

/// Reads the body of a non-success response into the shared error taxonomy.
pub(crate) async fn status_error(resp: reqwest::Response) -> GenerationError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    GenerationError::from_status(status, vendor_message(&body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(yaml: &str) -> LlmConfig {
        serde_yaml_ng::from_str(yaml).unwrap()
    }

    #[test]
    fn test_vendor_message_shapes() {
        assert_eq!(
            vendor_message(r#"{"error": {"message": "API key not valid", "code": 400}}"#),
            "API key not valid"
        );
        assert_eq!(vendor_message(r#"{"error": "model not found"}"#), "model not found");
        assert_eq!(vendor_message("  upstream timeout  "), "upstream timeout");
    }

    #[test]
    fn test_retry_policy_from_config() {
        let cfg = config("provider: gemini\nretry_count: 4\nretry_delay_ms: 250\n");
        let policy = cfg.retry_policy();
        assert_eq!(policy.max_retries, 4);
        assert_eq!(policy.initial_backoff, Duration::from_millis(250));
        assert_eq!(policy.backoff_factor, 2);
        assert_eq!(policy.timeout, Duration::from_secs(60));
        assert_eq!(policy.parse_retries, 1);
        assert!((policy.duplicate_threshold - 0.78).abs() < f64::EPSILON);
    }

    #[test]
    fn test_create_llm_requires_vendor_section() {
        let err = create_llm(&config("provider: claude\n")).unwrap_err();
        assert!(matches!(err, GenerationError::InvalidConfiguration(_)));

        let err = create_llm(&config("provider: mystery\n")).unwrap_err();
        assert!(err.to_string().contains("Unknown LLM provider"));
    }

    #[test]
    fn test_create_client_defaults_and_validation() {
        assert!(create_client("gemini", "key", "", None).is_ok());
        assert!(create_client("openai", "key", "gpt-4o", Some("http://localhost:8080/v1")).is_ok());
        assert!(matches!(
            create_client("claude", "  ", "", None),
            Err(GenerationError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            create_client("ollama", "", "", None),
            Err(GenerationError::InvalidConfiguration(_))
        ));
        assert!(create_client("ollama", "", "llama3", None).is_ok());
    }

    #[test]
    fn test_vendor_sections_fill_default_models() {
        let cfg = config(
            r#"
provider: claude
claude:
  api_key: sk-ant
gemini:
  api_key: g-key
ollama:
  model: llama3
"#,
        );
        assert_eq!(cfg.claude.unwrap().model, "claude-sonnet-4-5-20250929");
        assert_eq!(cfg.gemini.unwrap().model, "gemini-2.5-pro-preview-06-05");
        assert_eq!(cfg.ollama.unwrap().base_url, "http://localhost:11434");
        assert!(create_llm(&config("provider: ollama\nollama:\n  model: llama3\n")).is_ok());
    }
}
