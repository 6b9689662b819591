/*!
 * Retry and endpoint rotation policy.
 *
 * One `RotationPolicy` drives the attempts of a single fragment. It owns the
 * rotation index into the (shared, immutable) endpoint list, so concurrent
 * fragments never race on a common iterator.
 *
 * Attempt `n` that fails leads to attempt `n + 1` after a random wait. While
 * `n + 1` is below `rotate_from_attempt` the same endpoint is retried;
 * from then on every retry first moves to the next endpoint, round-robin.
 * After `max_attempts` failures the policy is `Failed`.
 */

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::TranslationCommonConfig;

/// Retry settings shared by every fragment of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    /// Attempts before giving up
    pub max_attempts: u32,
    /// First attempt number that rotates endpoints
    pub rotate_from_attempt: u32,
    /// Shortest wait between attempts
    pub backoff_min: Duration,
    /// Longest wait between attempts
    pub backoff_max: Duration,
}

impl RetrySettings {
    /// Settings from the `translation.common` config section
    pub fn from_config(config: &TranslationCommonConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            rotate_from_attempt: config.rotate_from_attempt.max(1),
            backoff_min: Duration::from_millis(config.backoff_min_ms),
            backoff_max: Duration::from_millis(config.backoff_max_ms.max(config.backoff_min_ms)),
        }
    }

    /// Settings without any wait, for tests and dry runs
    pub fn immediate(max_attempts: u32, rotate_from_attempt: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            rotate_from_attempt: rotate_from_attempt.max(1),
            backoff_min: Duration::ZERO,
            backoff_max: Duration::ZERO,
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self::from_config(&TranslationCommonConfig::default())
    }
}

/// Uniformly random duration in `[min, max]`
pub fn random_between<R: Rng + ?Sized>(rng: &mut R, min: Duration, max: Duration) -> Duration {
    let min_ms = min.as_millis() as u64;
    let max_ms = max.as_millis() as u64;
    if max_ms <= min_ms {
        return min;
    }
    Duration::from_millis(rng.random_range(min_ms..=max_ms))
}

/// Where a fragment's attempts stand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyState {
    /// Attempt number `n` (1-based) is in flight or about to start
    Attempting(u32),
    /// An attempt returned a translation
    Succeeded,
    /// Every attempt failed
    Failed,
}

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait, then run the next attempt against `endpoint_index`
    Retry {
        /// Endpoint the next attempt targets
        endpoint_index: usize,
        /// Time to wait before it
        wait: Duration,
        /// Whether the endpoint changed
        rotated: bool,
    },
    /// Stop; the fragment failed
    GiveUp,
}

/// Per-fragment retry state machine
#[derive(Debug, Clone)]
pub struct RotationPolicy {
    endpoints: Arc<Vec<String>>,
    index: usize,
    state: PolicyState,
    settings: RetrySettings,
}

impl RotationPolicy {
    /// Start at attempt 1 on endpoint `start_index` (taken modulo the list length)
    ///
    /// `endpoints` must not be empty.
    pub fn new(endpoints: Arc<Vec<String>>, start_index: usize, settings: RetrySettings) -> Self {
        let index = if endpoints.is_empty() { 0 } else { start_index % endpoints.len() };
        Self {
            endpoints,
            index,
            state: PolicyState::Attempting(1),
            settings,
        }
    }

    /// Current state
    pub fn state(&self) -> PolicyState {
        self.state
    }

    /// Index of the endpoint the current attempt targets
    pub fn endpoint_index(&self) -> usize {
        self.index
    }

    /// Endpoint the current attempt targets
    pub fn endpoint(&self) -> &str {
        self.endpoints
            .get(self.index)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Number of the current (or last) attempt
    pub fn attempt(&self) -> u32 {
        match self.state {
            PolicyState::Attempting(n) => n,
            _ => self.settings.max_attempts,
        }
    }

    /// Record a successful attempt
    pub fn on_success(&mut self) {
        self.state = PolicyState::Succeeded;
    }

    /// Record a failed attempt and decide what comes next
    pub fn on_failure<R: Rng + ?Sized>(&mut self, rng: &mut R) -> RetryDecision {
        let failed = match self.state {
            PolicyState::Attempting(n) => n,
            PolicyState::Succeeded | PolicyState::Failed => return RetryDecision::GiveUp,
        };

        if failed >= self.settings.max_attempts {
            self.state = PolicyState::Failed;
            return RetryDecision::GiveUp;
        }

        let next = failed + 1;
        let rotated = next >= self.settings.rotate_from_attempt && self.endpoints.len() > 1;
        if rotated {
            self.index = (self.index + 1) % self.endpoints.len();
        }
        self.state = PolicyState::Attempting(next);

        RetryDecision::Retry {
            endpoint_index: self.index,
            wait: random_between(rng, self.settings.backoff_min, self.settings.backoff_max),
            rotated,
        }
    }
}
