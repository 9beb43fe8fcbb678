//! Retry with exponential backoff for speech synthesis

use std::time::Duration;

use rand::Rng;

use crate::Error;

/// Retry policy for synthesis requests
///
/// Controls how many times synthesis is attempted for one cache entry and
/// how long to wait between attempts using exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first
    pub max_attempts: u32,
    /// Base delay between attempts (doubles each attempt)
    pub base_delay: Duration,
    /// Maximum delay cap
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(300),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Policy with the default attempt budget and no waiting between attempts
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Compute the delay before the next attempt.
///
/// The delay follows exponential backoff: `min(base_delay * 2^attempt + jitter, max_delay)`.
/// Jitter is 0-25% of the computed delay.
#[must_use]
pub fn delay_for_attempt(policy: &RetryPolicy, attempt: u32) -> Duration {
    let base = policy
        .base_delay
        .saturating_mul(2u32.saturating_pow(attempt));
    let base = base.min(policy.max_delay);

    let jitter_fraction = rand::thread_rng().gen_range(0.0..0.25);
    let jitter = base.mul_f64(jitter_fraction);

    (base + jitter).min(policy.max_delay)
}

/// Whether an HTTP failure from a TTS service is worth retrying
///
/// Rate limits (429), server errors (5xx) and transport failures reported in
/// the body are recoverable. Other client errors (bad key, bad voice) are not.
#[must_use]
pub fn is_recoverable(status: u16, body: &str) -> bool {
    if status == 429 {
        return true;
    }

    if (500..600).contains(&status) {
        return true;
    }

    let lower = body.to_lowercase();
    lower.contains("connection reset") || lower.contains("timed out") || lower.contains("dns error")
}

/// Whether a failed synthesis attempt should be tried again
///
/// A TTS error without a status (no audio, dropped response) and a transport
/// failure are retried. Local IO errors and rejected requests are not.
#[must_use]
pub fn is_retryable(error: &Error) -> bool {
    match error {
        Error::Tts {
            status: Some(status),
            message,
        } => is_recoverable(*status, message),
        Error::Tts { status: None, .. } => true,
        Error::Http(e) => match e.status() {
            Some(status) => is_recoverable(status.as_u16(), &e.to_string()),
            None => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
        },
        _ => false,
    }
}
