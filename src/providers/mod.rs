/*!
 * Provider implementations for different translation services.
 *
 * This module contains client implementations for the supported backends:
 * - Google: the public Google Translate web endpoint, one host per domain suffix
 * - Zhipu: Zhipu AI chat-completions API
 * - Mock: scripted provider for tests
 */

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::{TranslationConfig, TranslationProvider};
use crate::errors::ProviderError;

/// Common trait for all translation providers
///
/// A provider performs exactly one remote call per invocation. Which
/// endpoint variant the call targets is decided by the caller's retry
/// policy, so implementations stay stateless.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Short provider name for logs
    fn name(&self) -> &str;

    /// Translate `text` into `target_language` through `endpoint`
    ///
    /// # Arguments
    /// * `text` - The text to translate
    /// * `target_language` - Destination language tag
    /// * `endpoint` - One of the configured endpoint variants
    ///
    /// # Returns
    /// * `Result<String, ProviderError>` - The translated text or an error
    async fn translate(
        &self,
        text: &str,
        target_language: &str,
        endpoint: &str,
    ) -> Result<String, ProviderError>;
}

/// Build the configured provider
pub fn create_provider(config: &TranslationConfig) -> Result<Arc<dyn Provider>> {
    let timeout = Duration::from_secs(config.get_timeout_secs());
    let proxy = config.get_http_proxy();

    let provider: Arc<dyn Provider> = match config.provider {
        TranslationProvider::Google => Arc::new(
            google::GoogleTranslate::new(timeout, proxy.as_deref())
                .map_err(|e| anyhow!("Failed to create Google Translate client: {}", e))?,
        ),
        TranslationProvider::Zhipu => Arc::new(
            zhipu::ZhipuAi::new(config.get_api_key(), config.get_model(), timeout, proxy.as_deref())
                .map_err(|e| anyhow!("Failed to create Zhipu AI client: {}", e))?,
        ),
    };

    Ok(provider)
}

/// Build an HTTP client with the given timeout and optional proxy
pub(crate) fn build_http_client(
    timeout: Duration,
    proxy: Option<&str>,
) -> Result<reqwest::Client, ProviderError> {
    let mut builder = reqwest::Client::builder()
        .timeout(timeout)
        .pool_idle_timeout(Duration::from_secs(90));

    if let Some(proxy) = proxy {
        let proxy = reqwest::Proxy::all(proxy)
            .map_err(|e| ProviderError::ConnectionError(format!("Invalid proxy {}: {}", proxy, e)))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| ProviderError::ConnectionError(e.to_string()))
}

/// Map a non-success HTTP status to a provider error
pub(crate) fn status_error(status: reqwest::StatusCode, body: String) -> ProviderError {
    match status.as_u16() {
        429 => ProviderError::RateLimitExceeded(body),
        401 | 403 => ProviderError::AuthenticationError(body),
        code => ProviderError::ApiError {
            status_code: code,
            message: body,
        },
    }
}

pub mod google;
pub mod zhipu;
pub mod mock;
