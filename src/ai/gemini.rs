//! Google Gemini API client.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::{AiError, AiResult, ModelConfig, TextModel, TextRequest};

/// Gemini API client
#[derive(Debug, Clone)]
pub struct GeminiClient {
    config: ModelConfig,
    client: Client,
    base_url: String,
}

/// Gemini API request format
#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

/// Gemini API response format
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiResponseContent,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: Option<u32>,
    #[serde(default)]
    candidates_token_count: Option<u32>,
    #[serde(default)]
    total_token_count: Option<u32>,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(config: ModelConfig) -> AiResult<Self> {
        if config.api_key.is_empty() {
            return Err(AiError::AuthenticationError);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(AiError::HttpError)?;

        let base_url = "https://generativelanguage.googleapis.com/v1beta/models".to_string();

        Ok(Self {
            config,
            client,
            base_url,
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    async fn send_request(&self, system_prompt: &str, user_prompt: &str) -> AiResult<String> {
        let full_prompt = format!("{}\n\n{}", system_prompt, user_prompt);

        let request_body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: full_prompt }],
            }],
            generation_config: Some(GeminiGenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_tokens,
            }),
        };

        let url = format!(
            "{}/{}:generateContent?key={}",
            self.base_url, self.config.model, self.config.api_key
        );

        debug!(
            "Sending request to Gemini API: {}",
            url.replace(&self.config.api_key, "***")
        );

        let response = self
            .client
            .post(&url)
            .json(&request_body)
            .send()
            .await
            .map_err(AiError::HttpError)?;

        let status = response.status();
        let response_text = response.text().await.map_err(AiError::HttpError)?;

        debug!("Gemini API response status: {}", status);

        if !status.is_success() {
            error!("Gemini API error: {} - {}", status, response_text);
            return Err(AiError::ApiError(format!(
                "HTTP {}: {}",
                status, response_text
            )));
        }

        let gemini_response: GeminiResponse =
            serde_json::from_str(&response_text).map_err(|e| {
                error!("Failed to parse Gemini response: {}", e);
                AiError::JsonError(e)
            })?;

        let candidate = gemini_response
            .candidates
            .first()
            .ok_or_else(|| AiError::InvalidResponse("No candidates in response".to_string()))?;
        let part = candidate
            .content
            .parts
            .first()
            .ok_or_else(|| AiError::InvalidResponse("No parts in candidate".to_string()))?;

        if let Some(usage) = &gemini_response.usage_metadata {
            info!(
                "Gemini API usage - Prompt: {:?} tokens, Response: {:?} tokens, Total: {:?} tokens",
                usage.prompt_token_count, usage.candidates_token_count, usage.total_token_count
            );
        }

        Ok(part.text.clone())
    }
}

#[async_trait::async_trait]
impl TextModel for GeminiClient {
    async fn generate(&self, request: TextRequest) -> AiResult<String> {
        let user_prompt = request.rendered_user_prompt();
        let text = self
            .send_request(&request.system_prompt, &user_prompt)
            .await?;
        info!("Gemini generation completed ({} chars)", text.len());
        Ok(text)
    }

    async fn health_check(&self) -> AiResult<bool> {
        debug!("Performing Gemini API health check");

        let probe = TextRequest::new("You are a health probe.", "Reply with the word ok.");
        match self.generate(probe).await {
            Ok(text) => Ok(!text.is_empty()),
            Err(e) => {
                warn!("Gemini API health check failed: {}", e);
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> ModelConfig {
        ModelConfig {
            api_key: "test-key".to_string(),
            model: "gemini-2.5-flash".to_string(),
            max_tokens: Some(1024),
            temperature: Some(0.1),
            timeout_seconds: 30,
        }
    }

    #[test]
    fn test_gemini_client_creation() {
        let config = create_test_config();
        let client = GeminiClient::new(config);
        assert!(client.is_ok());
    }

    #[test]
    fn test_gemini_client_empty_api_key() {
        let mut config = create_test_config();
        config.api_key = "".to_string();
        let client = GeminiClient::new(config);
        assert!(matches!(client.err(), Some(AiError::AuthenticationError)));
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "Analysis: looks healthy."}]}}
            ],
            "usageMetadata": null
        }"#;
        let parsed: GeminiResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            parsed.candidates[0].content.parts[0].text,
            "Analysis: looks healthy."
        );
    }

    // Integration test - requires API key
    #[tokio::test]
    #[ignore = "Requires GEMINI_API_KEY environment variable"]
    async fn test_gemini_integration() {
        let config = ModelConfig::default();
        if config.api_key.is_empty() {
            panic!("GEMINI_API_KEY environment variable required for integration test");
        }

        let client = GeminiClient::new(config).unwrap();
        let request = TextRequest::new(
            "You are a concise assistant.",
            "Summarize why onboarding surveys matter in one sentence.",
        );
        let response = client.generate(request).await;
        assert!(response.is_ok());
        assert!(!response.unwrap().is_empty());
    }
}
