/*!
 * Google Translate web endpoint client.
 *
 * Each endpoint variant is a domain suffix: "co.jp" targets
 * `https://translate.google.co.jp/translate_a/single`. A full URL may be
 * given instead of a suffix to reach a mirror.
 */

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::{build_http_client, status_error, Provider};

/// Client for the `translate_a/single` endpoint
#[derive(Debug, Clone)]
pub struct GoogleTranslate {
    /// HTTP client for API requests
    client: Client,
}

impl GoogleTranslate {
    /// Create a new client
    pub fn new(timeout: Duration, proxy: Option<&str>) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_http_client(timeout, proxy)?,
        })
    }

    /// URL of the translate endpoint for a suffix or explicit base URL
    pub fn endpoint_url(endpoint: &str) -> String {
        let endpoint = endpoint.trim();
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            format!("{}/translate_a/single", endpoint.trim_end_matches('/'))
        } else {
            format!(
                "https://translate.google.{}/translate_a/single",
                endpoint.trim_start_matches('.')
            )
        }
    }

    /// Concatenate the translated sentences of a response
    ///
    /// The body is a nested array; element `[0]` lists sentences and each
    /// sentence carries its translation at index `[0]`.
    pub fn parse_response(body: &Value) -> Result<String, ProviderError> {
        let sentences = body
            .get(0)
            .and_then(Value::as_array)
            .ok_or_else(|| ProviderError::ParseError("missing sentence array".to_string()))?;

        let translated: String = sentences
            .iter()
            .filter_map(|sentence| sentence.get(0).and_then(Value::as_str))
            .collect();

        if translated.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }

        Ok(translated)
    }
}

#[async_trait]
impl Provider for GoogleTranslate {
    fn name(&self) -> &str {
        "google"
    }

    async fn translate(
        &self,
        text: &str,
        target_language: &str,
        endpoint: &str,
    ) -> Result<String, ProviderError> {
        let url = Self::endpoint_url(endpoint);
        debug!("Google Translate request to {} ({} chars)", url, text.chars().count());

        let response = self
            .client
            .get(&url)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", target_language),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Self::parse_response(&body)
    }
}
