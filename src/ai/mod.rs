//! Generative-text integration.
//!
//! Nexus delegates three jobs to a hosted text model: chat-agent testing,
//! onboarding survey analysis, and proposal drafting. The `TextModel` trait
//! is the seam; `GeminiClient` is the production implementation and
//! `ScriptedModel` the in-memory one used by tests and local development
//! without an API key.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod gemini;
pub mod prompt_builder;
pub mod scripted;

pub use gemini::GeminiClient;
pub use scripted::ScriptedModel;

/// Text model configuration.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub api_key: String,
    pub model: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("GEMINI_API_KEY").unwrap_or_default(),
            model: std::env::var("NEXUS_TEXT_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-flash".to_string()),
            max_tokens: Some(2048),
            temperature: Some(0.2),
            timeout_seconds: 60,
        }
    }
}

/// Errors from the text-model integration.
#[derive(Error, Debug)]
pub enum AiError {
    #[error("Missing or empty API key")]
    AuthenticationError,

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type AiResult<T> = Result<T, AiError>;

/// A single generation request: system framing plus the user turn, with
/// optional key/value context appended to the user prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl TextRequest {
    pub fn new(system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            context: HashMap::new(),
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Render the user turn with its context block, the shape every
    /// provider implementation sends.
    pub fn rendered_user_prompt(&self) -> String {
        if self.context.is_empty() {
            return self.user_prompt.clone();
        }
        let mut prompt = self.user_prompt.clone();
        prompt.push_str("\n\nCONTEXT:\n");
        let mut keys: Vec<&String> = self.context.keys().collect();
        keys.sort();
        for key in keys {
            prompt.push_str(&format!("- {}: {}\n", key, self.context[key]));
        }
        prompt
    }
}

/// The provider seam.
#[async_trait::async_trait]
pub trait TextModel: Send + Sync {
    /// Generate a completion for the request.
    async fn generate(&self, request: TextRequest) -> AiResult<String>;

    /// Cheap availability probe.
    async fn health_check(&self) -> AiResult<bool>;
}

/// Strip a single wrapping markdown code fence, if present. Models wrap
/// markdown and JSON output in fences unpredictably.
pub fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed.to_string();
    }
    let inner = match trimmed.find('\n') {
        Some(idx) => &trimmed[idx + 1..],
        None => return trimmed.to_string(),
    };
    inner.trim_end().trim_end_matches("```").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rendered_prompt_without_context_is_unchanged() {
        let request = TextRequest::new("system", "hello");
        assert_eq!(request.rendered_user_prompt(), "hello");
    }

    #[test]
    fn rendered_prompt_appends_sorted_context() {
        let request = TextRequest::new("system", "hello")
            .with_context("plan", "Growth")
            .with_context("client", "Acme");
        let rendered = request.rendered_user_prompt();
        assert!(rendered.starts_with("hello"));
        let client_pos = rendered.find("client: Acme").unwrap();
        let plan_pos = rendered.find("plan: Growth").unwrap();
        assert!(client_pos < plan_pos);
    }

    #[test]
    fn strip_code_fence_unwraps_fenced_blocks() {
        assert_eq!(strip_code_fence("plain text"), "plain text");
        assert_eq!(strip_code_fence("```\nbody\n```"), "body");
        assert_eq!(strip_code_fence("```markdown\n# Title\nbody\n```"), "# Title\nbody");
    }
}
