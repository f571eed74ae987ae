//! Chat-model gateway
//!
//! Wraps the hosted chat-completion service. Unlike the data gateways,
//! failures here always propagate to the caller as request failures.

use crate::config::LlmConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// A role-tagged chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Trait for chat-completion generation
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Single-turn completion for a prompt
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Multi-turn completion over a message history
    async fn chat(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// OpenAI chat-completions client
pub struct OpenAiChat {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

impl OpenAiChat {
    /// Create a new chat client from configuration
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| AppError::Configuration {
            message: "llm.api_key is required".to_string(),
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            base_url: config
                .api_base
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }

    async fn call(&self, messages: &[ChatMessage]) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
        };

        let start = Instant::now();
        let outcome = self.call_inner(&url, &request).await;
        metrics::record_llm(start.elapsed().as_secs_f64(), &self.model, outcome.is_ok());
        outcome
    }

    async fn call_inner(&self, url: &str, request: &ChatRequest<'_>) -> Result<String> {
        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::ChatModel {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ChatModel {
                message: format!("API error {}: {}", status, body),
            });
        }

        let chat_response: ChatResponse =
            response.json().await.map_err(|e| AppError::ChatModel {
                message: format!("Failed to parse response: {}", e),
            })?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AppError::ChatModel {
                message: "Empty response".to_string(),
            })
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.call(&[ChatMessage::user(prompt)]).await
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        self.call(messages).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Scripted chat model for testing
///
/// Returns a fixed reply and records every prompt it receives.
pub struct ScriptedChat {
    reply: String,
    pub prompts: std::sync::Mutex<Vec<String>>,
}

impl ScriptedChat {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            prompts: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Prompts seen so far, oldest first
    pub fn seen(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedChat {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }

    async fn chat(&self, messages: &[ChatMessage]) -> Result<String> {
        let joined = messages
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n");
        self.prompts.lock().unwrap().push(joined);
        Ok(self.reply.clone())
    }

    fn model_name(&self) -> &str {
        "scripted-chat"
    }
}

/// Chat model that always fails, for testing propagation paths
pub struct FailingChat;

#[async_trait]
impl ChatModel for FailingChat {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Err(AppError::ChatModel {
            message: "upstream unavailable".to_string(),
        })
    }

    async fn chat(&self, _messages: &[ChatMessage]) -> Result<String> {
        Err(AppError::ChatModel {
            message: "upstream unavailable".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        "failing-chat"
    }
}
