/*!
 * Mock provider implementations for testing.
 *
 * This module provides mock providers that simulate different behaviors:
 * - `MockProvider::working()` - Always succeeds with a tagged translation
 * - `MockProvider::fail_first(n)` - Each distinct text fails `n` times, then succeeds
 * - `MockProvider::failing()` - Always fails with an error
 *
 * Every call is recorded with the endpoint it targeted so tests can check
 * rotation and which fragments were (re)translated.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::providers::Provider;

/// One recorded provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    /// The text to translate
    pub text: String,
    /// Target language
    pub target_language: String,
    /// Endpoint variant used
    pub endpoint: String,
    /// Whether the call succeeded
    pub succeeded: bool,
}

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds with a proper translation
    Working,
    /// Each distinct text fails this many times before succeeding
    FailFirst { failures: usize },
    /// Always fails with an error
    Failing,
    /// Returns an empty translation
    Empty,
    /// Simulates slow response (for cancellation testing)
    Slow { delay_ms: u64 },
}

/// Mock provider for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockProvider {
    /// Behavior mode
    behavior: MockBehavior,
    /// Texts containing any of these always fail, whatever the behavior
    failing_texts: Vec<String>,
    /// Total request counter
    request_count: Arc<AtomicUsize>,
    /// Attempts seen per text
    attempts: Arc<Mutex<HashMap<String, usize>>>,
    /// Call log
    calls: Arc<Mutex<Vec<MockCall>>>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&str, &str) -> String>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            failing_texts: Vec::new(),
            request_count: Arc::new(AtomicUsize::new(0)),
            attempts: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            custom_response: None,
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Create a provider where every text fails `failures` times first
    pub fn fail_first(failures: usize) -> Self {
        Self::new(MockBehavior::FailFirst { failures })
    }

    /// Create a failing mock provider that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Create a mock that returns empty translations
    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Create a mock that answers after a delay
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Make every text containing `needle` fail permanently
    pub fn failing_on(mut self, needle: impl Into<String>) -> Self {
        self.failing_texts.push(needle.into());
        self
    }

    /// Set a custom response generator taking `(text, target_language)`
    pub fn with_custom_response(mut self, generator: fn(&str, &str) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// The translation a working mock returns for `text`
    pub fn expected_translation(text: &str, target_language: &str) -> String {
        format!("[{}] {}", target_language, text)
    }

    /// Total number of requests made
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Snapshot of all recorded calls
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    /// Distinct texts that were sent at least once, sorted
    pub fn requested_texts(&self) -> Vec<String> {
        let mut texts: Vec<String> = self.calls.lock().iter().map(|c| c.text.clone()).collect();
        texts.sort();
        texts.dedup();
        texts
    }

    fn respond(&self, text: &str, target_language: &str, attempt: usize) -> Result<String, ProviderError> {
        if self.failing_texts.iter().any(|needle| text.contains(needle.as_str())) {
            return Err(ProviderError::ConnectionError(format!(
                "Simulated permanent failure for '{}'",
                text
            )));
        }

        let translated = || match self.custom_response {
            Some(generator) => generator(text, target_language),
            None => Self::expected_translation(text, target_language),
        };

        match self.behavior {
            MockBehavior::Working | MockBehavior::Slow { .. } => Ok(translated()),
            MockBehavior::FailFirst { failures } => {
                if attempt <= failures {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated transient failure (attempt #{})", attempt),
                        status_code: 503,
                    })
                } else {
                    Ok(translated())
                }
            }
            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),
            MockBehavior::Empty => Err(ProviderError::EmptyResponse),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn translate(
        &self,
        text: &str,
        target_language: &str,
        endpoint: &str,
    ) -> Result<String, ProviderError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);

        if let MockBehavior::Slow { delay_ms } = self.behavior {
            tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
        }

        let attempt = {
            let mut attempts = self.attempts.lock();
            let count = attempts.entry(text.to_string()).or_insert(0);
            *count += 1;
            *count
        };

        let result = self.respond(text, target_language, attempt);

        self.calls.lock().push(MockCall {
            text: text.to_string(),
            target_language: target_language.to_string(),
            endpoint: endpoint.to_string(),
            succeeded: result.is_ok(),
        });

        result
    }
}
