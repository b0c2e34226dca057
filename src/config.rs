//! Run configuration and the run-scoped context.

use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::fetch::{DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY, RetryPolicy};

/// Minimum allowed concurrency value.
pub const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
pub const MAX_CONCURRENCY: usize = 30;

/// Default concurrency if not specified.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Maximum allowed attempts per network operation.
pub const MAX_RETRY_ATTEMPTS: u32 = 10;

/// Shortest allowed per-attempt timeout.
pub const MIN_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

/// Longest allowed per-attempt timeout.
pub const MAX_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Longest allowed backoff base.
pub const MAX_BACKOFF_BASE: Duration = Duration::from_secs(60);

/// Default backoff jitter bound.
const DEFAULT_BACKOFF_JITTER: Duration = Duration::from_millis(250);

/// Backoff multiplier between consecutive retries.
const BACKOFF_MULTIPLIER: f32 = 2.0;

/// Rejected configuration values. Always reported before any network access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Concurrency outside the allowed range.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Attempt count outside the allowed range.
    #[error("invalid max retry attempts {value}: must be between 1 and {MAX_RETRY_ATTEMPTS}")]
    InvalidRetryAttempts {
        /// The invalid value that was provided.
        value: u32,
    },

    /// Request timeout outside the allowed range.
    #[error("invalid request timeout {value:?}: must be between 1s and 300s")]
    InvalidTimeout {
        /// The invalid value that was provided.
        value: Duration,
    },

    /// Backoff settings that cannot form a schedule.
    #[error("invalid backoff: {reason}")]
    InvalidBackoff {
        /// What is wrong with the settings.
        reason: String,
    },
}

/// Tunables of one run.
///
/// # Default Values
///
/// - `concurrency_limit`: 10
/// - `max_retry_attempts`: 3
/// - `request_timeout`: 15 seconds
/// - `backoff_base`: 500ms
/// - `backoff_max`: 8 seconds
/// - `backoff_jitter`: 250ms
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Pipelines allowed in flight at once.
    pub concurrency_limit: usize,
    /// Attempts per network operation, the first one included.
    pub max_retry_attempts: u32,
    /// Timeout of one network attempt.
    pub request_timeout: Duration,
    /// Delay before the first retry.
    pub backoff_base: Duration,
    /// Cap on any single backoff delay.
    pub backoff_max: Duration,
    /// Upper bound of random jitter added to each delay.
    pub backoff_jitter: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: DEFAULT_CONCURRENCY,
            max_retry_attempts: DEFAULT_MAX_ATTEMPTS,
            request_timeout: crate::fetch::DEFAULT_REQUEST_TIMEOUT,
            backoff_base: DEFAULT_BASE_DELAY,
            backoff_max: DEFAULT_MAX_DELAY,
            backoff_jitter: DEFAULT_BACKOFF_JITTER,
        }
    }
}

impl RunConfig {
    /// Checks every value against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&self.concurrency_limit) {
            return Err(ConfigError::InvalidConcurrency {
                value: self.concurrency_limit,
            });
        }
        if !(1..=MAX_RETRY_ATTEMPTS).contains(&self.max_retry_attempts) {
            return Err(ConfigError::InvalidRetryAttempts {
                value: self.max_retry_attempts,
            });
        }
        if !(MIN_REQUEST_TIMEOUT..=MAX_REQUEST_TIMEOUT).contains(&self.request_timeout) {
            return Err(ConfigError::InvalidTimeout {
                value: self.request_timeout,
            });
        }
        if self.backoff_base > MAX_BACKOFF_BASE {
            return Err(ConfigError::InvalidBackoff {
                reason: format!("base {:?} exceeds {MAX_BACKOFF_BASE:?}", self.backoff_base),
            });
        }
        if self.backoff_max < self.backoff_base {
            return Err(ConfigError::InvalidBackoff {
                reason: format!(
                    "max {:?} is below base {:?}",
                    self.backoff_max, self.backoff_base
                ),
            });
        }
        Ok(())
    }

    /// Builds the retry policy described by this configuration.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retry_attempts,
            self.backoff_base,
            self.backoff_max,
            BACKOFF_MULTIPLIER,
        )
        .with_max_jitter(self.backoff_jitter)
    }
}

/// Everything one run needs besides its input: validated configuration and
/// the cancellation signal.
///
/// Cancellation is one-way and idempotent. Clones of the token from
/// [`RunContext::cancel_token`] can be handed to signal handlers.
#[derive(Debug, Clone)]
pub struct RunContext {
    config: RunConfig,
    cancel: CancellationToken,
}

impl RunContext {
    /// Validates `config` and creates a fresh, uncancelled context.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is out of range.
    pub fn new(config: RunConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        debug!(?config, "created run context");
        Ok(Self {
            config,
            cancel: CancellationToken::new(),
        })
    }

    /// Returns the run configuration.
    #[must_use]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Returns a handle to the run's cancellation token.
    #[must_use]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Signals cancellation. Repeated calls have no further effect.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns true once the run has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
