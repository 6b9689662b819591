use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::errors::ProviderError;
use crate::language_utils;
use crate::providers::{build_http_client, status_error, Provider};

/// Zhipu AI client for the OpenAI-compatible chat-completions API
#[derive(Debug)]
pub struct ZhipuAi {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// Model name, e.g. "glm-4-flash"
    model: String,
}

/// Chat completion request
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    /// The model to use
    model: String,

    /// The conversation
    messages: Vec<ChatMessage>,

    /// Sampling temperature
    temperature: f32,
}

/// One chat message
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,

    /// Content of the message
    pub content: String,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    /// Generated alternatives
    pub choices: Vec<ChatChoice>,
}

/// One generated alternative
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    /// The generated message
    pub message: ChatMessage,
}

impl ZhipuAi {
    /// Create a new Zhipu AI client
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
        proxy: Option<&str>,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_http_client(timeout, proxy)?,
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Chat-completions URL below an API base URL
    pub fn chat_url(endpoint: &str) -> Result<Url, ProviderError> {
        let base = format!("{}/", endpoint.trim().trim_end_matches('/'));
        Url::parse(&base)
            .and_then(|url| url.join("chat/completions"))
            .map_err(|e| ProviderError::ConnectionError(format!("Invalid endpoint {}: {}", endpoint, e)))
    }

    /// System prompt instructing the model to answer with the bare translation
    pub fn system_prompt(target_language: &str) -> String {
        let language = language_utils::get_language_name(target_language)
            .unwrap_or_else(|_| target_language.to_string());

        format!(
            "You are a professional literary translator. Translate the text the user sends into {}. \
             Reply with the translation only: no explanations, notes, quotes or the original text. \
             Keep names, numbers and punctuation consistent with the source.",
            language
        )
    }

    /// Build the request body for one fragment
    pub fn build_request(&self, text: &str, target_language: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: Self::system_prompt(target_language),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: text.to_string(),
                },
            ],
            temperature: 0.3,
        }
    }

    /// Extract the translated text from a response
    pub fn extract_text(response: &ChatResponse) -> Result<String, ProviderError> {
        let text = response
            .choices
            .first()
            .map(|choice| choice.message.content.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }

        Ok(text)
    }
}

#[async_trait]
impl Provider for ZhipuAi {
    fn name(&self) -> &str {
        "zhipu"
    }

    async fn translate(
        &self,
        text: &str,
        target_language: &str,
        endpoint: &str,
    ) -> Result<String, ProviderError> {
        let url = Self::chat_url(endpoint)?;
        debug!("Zhipu AI request to {} with model {}", url, self.model);

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&self.build_request(text, target_language))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Zhipu AI API error ({}): {}", status, body);
            return Err(status_error(status, body));
        }

        let response: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Self::extract_text(&response)
    }
}
