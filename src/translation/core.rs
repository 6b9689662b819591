/*!
 * Core translation service implementation.
 *
 * `TranslationService` turns one fragment into one translation: it checks
 * the job cache, drives a fresh `RotationPolicy` through the provider's
 * endpoints, sleeps the backoff between attempts (cut short on cancel) and
 * applies the glossary to whatever comes back.
 */

use anyhow::{Result, anyhow};
use log::{debug, warn};
use std::sync::Arc;
use std::time::Instant;

use crate::app_config::Config;
use crate::cancel::CancelToken;
use crate::errors::TranslationError;
use crate::providers::{self, Provider};

use super::cache::TranslationCache;
use super::glossary::Glossary;
use super::retry::{RetryDecision, RetrySettings, RotationPolicy};

/// Shared, cheaply cloneable fragment translator
#[derive(Clone)]
pub struct TranslationService {
    provider: Arc<dyn Provider>,
    endpoints: Arc<Vec<String>>,
    settings: RetrySettings,
    cache: TranslationCache,
    glossary: Arc<Glossary>,
    cancel: CancelToken,
}

impl TranslationService {
    /// Create a service over an already built provider
    pub fn new(
        provider: Arc<dyn Provider>,
        endpoints: Vec<String>,
        settings: RetrySettings,
        cancel: CancelToken,
    ) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(anyhow!("Provider '{}' has no endpoints configured", provider.name()));
        }

        Ok(Self {
            provider,
            endpoints: Arc::new(endpoints),
            settings,
            cache: TranslationCache::new(true),
            glossary: Arc::new(Glossary::default()),
            cancel,
        })
    }

    /// Build the provider, glossary and retry settings from configuration
    pub fn from_config(config: &Config, cancel: CancelToken) -> Result<Self> {
        let provider = providers::create_provider(&config.translation)?;
        Self::from_config_with_provider(config, provider, cancel)
    }

    /// Like `from_config`, with an already built provider
    pub fn from_config_with_provider(
        config: &Config,
        provider: Arc<dyn Provider>,
        cancel: CancelToken,
    ) -> Result<Self> {
        let translation = &config.translation;

        let glossary = match translation.common.glossary_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Glossary::load(path)?,
            _ => Glossary::default(),
        };

        Ok(Self::new(
            provider,
            translation.get_endpoints(),
            RetrySettings::from_config(&translation.common),
            cancel,
        )?
        .with_glossary(glossary)
        .with_cache(TranslationCache::new(translation.common.cache_enabled)))
    }

    /// Replace the glossary
    pub fn with_glossary(mut self, glossary: Glossary) -> Self {
        self.glossary = Arc::new(glossary);
        self
    }

    /// Replace the cache
    pub fn with_cache(mut self, cache: TranslationCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Translate one fragment, starting on endpoint `start_index`
    ///
    /// The returned text already has the glossary applied.
    pub async fn translate_fragment(
        &self,
        text: &str,
        target_language: &str,
        start_index: usize,
    ) -> Result<String, TranslationError> {
        if let Some(cached) = self.cache.get(text, target_language) {
            return Ok(cached);
        }

        let mut policy = RotationPolicy::new(self.endpoints.clone(), start_index, self.settings);

        loop {
            if self.cancel.is_cancelled() {
                return Err(TranslationError::Cancelled);
            }

            let attempt = policy.attempt();
            let endpoint = policy.endpoint().to_string();
            let started = Instant::now();

            let result = tokio::select! {
                result = self.provider.translate(text, target_language, &endpoint) => result,
                _ = self.cancel.cancelled() => return Err(TranslationError::Cancelled),
            };

            let last_error = match result {
                Ok(translated) => {
                    policy.on_success();
                    debug!(
                        "Translated {} chars via '{}' in {:?} (attempt {})",
                        text.chars().count(),
                        endpoint,
                        started.elapsed(),
                        attempt
                    );
                    let translated = self.glossary.apply(&translated);
                    self.cache.store(text, target_language, &translated);
                    return Ok(translated);
                }
                Err(e) => e,
            };

            // ThreadRng is not Send; keep it out of the await below
            let decision = policy.on_failure(&mut rand::rng());
            match decision {
                RetryDecision::GiveUp => {
                    warn!(
                        "Giving up after {} attempts via {}: {}",
                        attempt,
                        self.provider.name(),
                        last_error
                    );
                    return Err(TranslationError::Exhausted {
                        attempts: attempt,
                        last_error,
                    });
                }
                RetryDecision::Retry { wait, rotated, .. } => {
                    warn!(
                        "Attempt {}/{} via '{}' failed: {}",
                        attempt, self.settings.max_attempts, endpoint, last_error
                    );
                    if rotated {
                        debug!("Rotating endpoint '{}' -> '{}'", endpoint, policy.endpoint());
                    }
                    debug!("Retrying in {:?}", wait);

                    if !self.cancel.sleep(wait).await {
                        return Err(TranslationError::Cancelled);
                    }
                }
            }
        }
    }
}
