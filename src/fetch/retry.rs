//! Retry logic with exponential backoff for transient fetch failures.
//!
//! When a network attempt fails, the error is classified into a
//! [`FailureType`]:
//! - [`FailureType::Transient`] - timeouts, connection errors and 5xx responses
//! - [`FailureType::Permanent`] - every 4xx response and cancellation
//!
//! The [`RetryPolicy`] then decides whether another attempt is made and how
//! long to wait first. [`with_retry`] drives an operation through the policy,
//! racing every attempt and every backoff wait against the run's cancellation
//! token.
//!
//! # Example
//!
//! ```
//! use vidmeta_core::fetch::{FetchError, RetryPolicy, RetryDecision, classify_error};
//!
//! let policy = RetryPolicy::default();
//! let error = FetchError::http_status("https://m.gifshow.com/fw/photo/abc", 503);
//!
//! match policy.should_retry(classify_error(&error), 1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         println!("Retrying in {:?} (attempt {})", delay, attempt);
//!     }
//!     RetryDecision::DoNotRetry { reason } => {
//!         println!("Not retrying: {}", reason);
//!     }
//! }
//! ```

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use super::FetchError;

/// Default maximum attempts, including the first one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay for exponential backoff (500ms).
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

/// Default maximum delay cap (8 seconds).
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(8);

/// Default backoff multiplier (doubles each attempt).
const DEFAULT_BACKOFF_MULTIPLIER: f32 = 2.0;

/// Default maximum jitter added to delays (250ms).
const DEFAULT_MAX_JITTER: Duration = Duration::from_millis(250);

/// Classification of fetch failure types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Temporary failure that may succeed on retry.
    ///
    /// Examples: request timeout, 5xx server errors, connection refused.
    Transient,

    /// Failure that another attempt would not fix.
    ///
    /// Examples: 404 Not Found, 429 Too Many Requests, cancellation.
    Permanent,
}

/// Decision on whether to retry a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Do not retry.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Configuration for retry behavior with exponential backoff.
///
/// # Default Values
///
/// - `max_attempts`: 3
/// - `base_delay`: 500ms
/// - `max_delay`: 8 seconds
/// - `backoff_multiplier`: 2.0
/// - `max_jitter`: 250ms
///
/// # Delay Calculation
///
/// ```text
/// delay = min(base_delay * multiplier^(attempt - 1) + jitter, max_delay)
/// jitter <= min(max_jitter, base_delay * (multiplier - 1))
/// ```
///
/// Delays never decrease from one retry to the next.
///
/// With defaults, delays are approximately: 500ms, 1s (before hitting max attempts).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,

    /// Base delay for the first retry.
    base_delay: Duration,

    /// Maximum delay cap.
    max_delay: Duration,

    /// Multiplier applied each attempt (typically 2.0 for doubling).
    backoff_multiplier: f32,

    /// Upper bound of the random jitter added to each delay.
    max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_jitter: DEFAULT_MAX_JITTER,
        }
    }
}

impl RetryPolicy {
    /// Creates a new retry policy with custom settings.
    ///
    /// # Arguments
    ///
    /// * `max_attempts` - Maximum attempts including initial (must be >= 1)
    /// * `base_delay` - Base delay for first retry
    /// * `max_delay` - Maximum delay cap
    /// * `backoff_multiplier` - Multiplier for exponential increase
    #[must_use]
    pub fn new(
        max_attempts: u32,
        base_delay: Duration,
        max_delay: Duration,
        backoff_multiplier: f32,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            backoff_multiplier,
            max_jitter: DEFAULT_MAX_JITTER,
        }
    }

    /// Creates a policy with a custom `max_attempts`, using defaults for other settings.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Replaces the jitter bound. `Duration::ZERO` makes delays deterministic.
    #[must_use]
    pub fn with_max_jitter(mut self, max_jitter: Duration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Determines whether to retry a failed attempt.
    ///
    /// # Arguments
    ///
    /// * `failure_type` - Classification of the failure
    /// * `attempt` - The attempt number that just failed (1-indexed)
    #[instrument(level = "trace", skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        if failure_type == FailureType::Permanent {
            return RetryDecision::DoNotRetry {
                reason: "permanent failure - retry would not help".to_string(),
            };
        }

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        let delay = self.calculate_delay(attempt);

        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );

        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    /// Calculates the delay for a retry attempt with exponential backoff and jitter.
    ///
    /// Jitter is added before the cap and never exceeds the smallest growth
    /// step, `base_delay * (multiplier - 1)`, so consecutive delays never
    /// shrink.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64;
        let multiplier = self.multiplier();

        // attempt 1 = multiplier^0 = 1x base
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let delay_ms = base_ms * multiplier.powi(exponent) + self.calculate_jitter().as_millis() as f64;

        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped_ms as u64)
    }

    fn multiplier(&self) -> f64 {
        f64::from(self.backoff_multiplier).max(1.0)
    }

    /// Jitter bound actually applied: `max_jitter`, limited to the smallest
    /// step between two consecutive uncapped delays.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    fn jitter_bound(&self) -> Duration {
        let step_ms = self.base_delay.as_millis() as f64 * (self.multiplier() - 1.0);
        self.max_jitter.min(Duration::from_millis(step_ms as u64))
    }

    /// Generates random jitter between 0 and [`Self::jitter_bound`].
    #[allow(clippy::cast_possible_truncation)]
    fn calculate_jitter(&self) -> Duration {
        let max_ms = self.jitter_bound().as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        let jitter_ms = rand::thread_rng().gen_range(0..=max_ms);
        Duration::from_millis(jitter_ms)
    }
}

/// Classifies a fetch error into a failure type for retry decisions.
///
/// | Error | Type |
/// |-------|------|
/// | Timeout | Transient |
/// | Connection | Transient |
/// | HTTP 5xx | Transient |
/// | HTTP 4xx (429 included) | Permanent |
/// | Cancelled | Permanent |
#[must_use]
pub fn classify_error(error: &FetchError) -> FailureType {
    match error {
        FetchError::Timeout { .. } | FetchError::Connection { .. } => FailureType::Transient,
        FetchError::HttpStatus { status, .. } => classify_http_status(*status),
        FetchError::Cancelled => FailureType::Permanent,
    }
}

fn classify_http_status(status: u16) -> FailureType {
    if (500..600).contains(&status) {
        FailureType::Transient
    } else {
        FailureType::Permanent
    }
}

/// Outcome of an operation driven through [`with_retry`].
#[derive(Debug)]
pub struct Attempted<T> {
    /// Final result; on failure this is the last attempt's error.
    pub outcome: Result<T, FetchError>,
    /// Attempts actually started.
    pub attempts: u32,
}

impl<T> Attempted<T> {
    /// Attempts beyond the first one.
    #[must_use]
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// Runs `op` until it succeeds, fails permanently, or attempts run out.
///
/// Each attempt and each backoff wait is raced against `cancel`; whichever
/// is pending when the token fires resolves to [`FetchError::Cancelled`].
/// When attempts are exhausted the last error is returned unchanged.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut op: F,
) -> Attempted<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut attempt = 0u32;

    loop {
        if cancel.is_cancelled() {
            return Attempted {
                outcome: Err(FetchError::Cancelled),
                attempts: attempt,
            };
        }

        attempt += 1;
        debug!(attempt, "starting attempt");

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(FetchError::Cancelled),
            result = op() => result,
        };

        let error = match result {
            Ok(value) => {
                return Attempted {
                    outcome: Ok(value),
                    attempts: attempt,
                };
            }
            Err(error) => error,
        };

        match policy.should_retry(classify_error(&error), attempt) {
            RetryDecision::Retry {
                delay,
                attempt: next_attempt,
            } => {
                info!(
                    attempt = next_attempt,
                    max_attempts = policy.max_attempts(),
                    delay_ms = delay.as_millis(),
                    error = %error,
                    "retrying request"
                );
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => {
                        debug!("backoff interrupted by cancellation");
                        return Attempted {
                            outcome: Err(FetchError::Cancelled),
                            attempts: attempt,
                        };
                    }
                    () = tokio::time::sleep(delay) => {}
                }
            }
            RetryDecision::DoNotRetry { reason } => {
                debug!(%reason, error = %error, "not retrying request");
                return Attempted {
                    outcome: Err(error),
                    attempts: attempt,
                };
            }
        }
    }
}
