//! Scripted in-memory text model.
//!
//! Returns queued canned responses (falling back to an echo) and records
//! every request it sees. Used by tests and by local development when no
//! API key is configured.

use std::collections::VecDeque;

use tokio::sync::Mutex;

use super::{AiResult, TextModel, TextRequest};

#[derive(Default)]
pub struct ScriptedModel {
    responses: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<TextRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a canned response, returned FIFO.
    pub async fn push_response(&self, text: impl Into<String>) {
        self.responses.lock().await.push_back(text.into());
    }

    /// Requests seen so far, in order.
    pub async fn requests(&self) -> Vec<TextRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl TextModel for ScriptedModel {
    async fn generate(&self, request: TextRequest) -> AiResult<String> {
        let canned = self.responses.lock().await.pop_front();
        let reply = canned.unwrap_or_else(|| format!("[scripted] {}", request.user_prompt));
        self.requests.lock().await.push(request);
        Ok(reply)
    }

    async fn health_check(&self) -> AiResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn canned_responses_are_fifo_then_echo() {
        let model = ScriptedModel::new();
        model.push_response("first").await;
        model.push_response("second").await;

        let one = model
            .generate(TextRequest::new("s", "question one"))
            .await
            .unwrap();
        let two = model
            .generate(TextRequest::new("s", "question two"))
            .await
            .unwrap();
        let three = model
            .generate(TextRequest::new("s", "question three"))
            .await
            .unwrap();

        assert_eq!(one, "first");
        assert_eq!(two, "second");
        assert!(three.contains("question three"));
        assert_eq!(model.requests().await.len(), 3);
    }
}
