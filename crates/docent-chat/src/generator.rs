//! Answer generator seam and implementations.
//!
//! - `OpenAiChatGenerator` calls an OpenAI-compatible chat completions
//!   endpoint with bearer auth and a request timeout.
//! - `MockGenerator` returns scripted replies (or failures) and records
//!   every prompt it receives, for testing.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use docent_core::error::DocentError;

use crate::prompt::PromptComponents;

/// Produces an answer from prompt components.
///
/// Fails with `DocentError::Generation` on network, API, or payload errors.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, prompt: &PromptComponents) -> Result<String, DocentError>;
}

// ---------------------------------------------------------------------------
// OpenAiChatGenerator
// ---------------------------------------------------------------------------

/// Connection settings for [`OpenAiChatGenerator`].
#[derive(Debug, Clone)]
pub struct OpenAiChatConfig {
    pub chat_completions_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

/// Answer generator backed by an OpenAI-compatible chat completions API.
#[derive(Clone)]
pub struct OpenAiChatGenerator {
    client: reqwest::Client,
    config: OpenAiChatConfig,
}

impl std::fmt::Debug for OpenAiChatGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiChatGenerator")
            .field("chat_completions_url", &self.config.chat_completions_url)
            .field("model", &self.config.model)
            .finish()
    }
}

impl OpenAiChatGenerator {
    pub fn new(config: OpenAiChatConfig) -> Result<Self, DocentError> {
        if config.api_key.trim().is_empty() {
            return Err(DocentError::Config(
                "An API key is required for the chat completions endpoint".to_string(),
            ));
        }
        if !config.chat_completions_url.starts_with("http://")
            && !config.chat_completions_url.starts_with("https://")
        {
            return Err(DocentError::Config(format!(
                "Chat completions URL must start with http:// or https://: {}",
                config.chat_completions_url
            )));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| DocentError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn request_body(&self, prompt: &PromptComponents) -> serde_json::Value {
        json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "messages": prompt.to_messages(),
        })
    }
}

#[async_trait]
impl AnswerGenerator for OpenAiChatGenerator {
    async fn generate(&self, prompt: &PromptComponents) -> Result<String, DocentError> {
        let response = self
            .client
            .post(&self.config.chat_completions_url)
            .bearer_auth(&self.config.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DocentError::Generation("Request timed out".to_string())
                } else {
                    DocentError::Generation(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DocentError::Generation(format!(
                "Provider returned {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| DocentError::Generation(format!("Invalid response payload: {}", e)))?;
        let answer = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| DocentError::Generation("Response contained no answer".to_string()))?;

        debug!(model = %self.config.model, chars = answer.len(), "Answer generated");
        Ok(answer)
    }
}

// ---------------------------------------------------------------------------
// MockGenerator
// ---------------------------------------------------------------------------

/// Scripted answer generator for testing.
///
/// Replies are taken from the script in order; once it is exhausted the
/// generator echoes the question. Every prompt is recorded.
#[derive(Debug, Default)]
pub struct MockGenerator {
    script: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<PromptComponents>>,
    always_fail: bool,
    delay: Option<Duration>,
}

impl MockGenerator {
    /// A generator that answers `Mock answer to: {question}`.
    pub fn new() -> Self {
        Self::default()
    }

    /// A generator that always fails.
    pub fn failing() -> Self {
        Self {
            always_fail: true,
            ..Self::default()
        }
    }

    /// A generator that returns the given replies in order.
    pub fn with_replies(replies: &[&str]) -> Self {
        Self {
            script: Mutex::new(replies.iter().map(|r| Ok(r.to_string())).collect()),
            ..Self::default()
        }
    }

    /// Queue a failure as the next scripted result.
    pub fn push_failure(&self, message: &str) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(Err(message.to_string()));
        }
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<PromptComponents> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().map(|p| p.len()).unwrap_or(0)
    }
}

#[async_trait]
impl AnswerGenerator for MockGenerator {
    async fn generate(&self, prompt: &PromptComponents) -> Result<String, DocentError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.clone());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.always_fail {
            return Err(DocentError::Generation("mock generator failure".to_string()));
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match next {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(DocentError::Generation(message)),
            None => Ok(format!("Mock answer to: {}", prompt.question)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docent_core::types::Turn;

    fn prompt(question: &str) -> PromptComponents {
        PromptComponents::general(vec![Turn::user(question)], question)
    }

    #[tokio::test]
    async fn test_mock_echoes_question_by_default() {
        let generator = MockGenerator::new();
        let answer = generator.generate(&prompt("hello?")).await.unwrap();
        assert_eq!(answer, "Mock answer to: hello?");
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_scripted_replies_then_echo() {
        let generator = MockGenerator::with_replies(&["first", "second"]);
        generator.push_failure("boom");
        assert_eq!(generator.generate(&prompt("a")).await.unwrap(), "first");
        assert_eq!(generator.generate(&prompt("b")).await.unwrap(), "second");
        assert!(matches!(
            generator.generate(&prompt("c")).await,
            Err(DocentError::Generation(msg)) if msg == "boom"
        ));
        assert_eq!(generator.generate(&prompt("d")).await.unwrap(), "Mock answer to: d");
    }

    #[tokio::test]
    async fn test_mock_failing_records_prompt() {
        let generator = MockGenerator::failing();
        assert!(generator.generate(&prompt("x")).await.is_err());
        assert_eq!(generator.prompts()[0].question, "x");
    }

    fn openai_config(api_key: &str, url: &str) -> OpenAiChatConfig {
        OpenAiChatConfig {
            chat_completions_url: url.to_string(),
            api_key: api_key.to_string(),
            model: "gpt-4-1106-preview".to_string(),
            temperature: 0.7,
            timeout_ms: 1_000,
        }
    }

    #[test]
    fn test_openai_requires_api_key() {
        let result = OpenAiChatGenerator::new(openai_config(
            " ",
            "https://api.openai.com/v1/chat/completions",
        ));
        assert!(matches!(result, Err(DocentError::Config(_))));
    }

    #[test]
    fn test_openai_request_body_shape() {
        let generator = OpenAiChatGenerator::new(openai_config(
            "sk-test",
            "https://api.openai.com/v1/chat/completions",
        ))
        .unwrap();
        let body = generator.request_body(&prompt("What is my name?"));
        assert_eq!(body["model"], "gpt-4-1106-preview");
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1]["content"], "What is my name?");
    }

    #[tokio::test]
    async fn test_openai_unreachable_endpoint_is_generation_error() {
        let generator = OpenAiChatGenerator::new(openai_config(
            "sk-test",
            "http://127.0.0.1:9/v1/chat/completions",
        ))
        .unwrap();
        assert!(matches!(
            generator.generate(&prompt("hi")).await,
            Err(DocentError::Generation(_))
        ));
    }
}
