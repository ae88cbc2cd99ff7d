//! Bounded retry on top of a [`Transport`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::sleep;
use std::time::Duration;

use rand::Rng;
use serde_json::Value;
use tracing::{error, warn};

use super::transport::Transport;
use crate::config::RetryConfig;
use crate::error::VepError;

/// Total attempts per request, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Retry budget and backoff between attempts
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per request (at least 1)
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles per attempt
    pub base_delay: Duration,
    /// Upper bound for a single delay
    pub max_delay: Duration,
    /// Randomize each delay within its upper half
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(10),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Retry immediately, up to `max_attempts` total attempts.
    pub fn no_backoff(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: false,
        }
    }

    /// Attempts actually made; a zero budget still makes one attempt.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }

        let shift = attempt.saturating_sub(1).min(16);
        let exponential = self
            .base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay);

        if !self.jitter {
            return exponential;
        }

        let ceiling = exponential.as_millis() as u64;
        let floor = ceiling / 2;
        let millis = rand::thread_rng().gen_range(floor..=ceiling);
        Duration::from_millis(millis)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.backoff_base_ms),
            max_delay: Duration::from_millis(config.backoff_max_ms),
            jitter: config.jitter,
        }
    }
}

/// Gateway request statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewayStats {
    /// Calls made to `get`
    pub calls: u64,
    /// HTTP requests sent, including retries
    pub requests: u64,
    /// Requests that were repeated after a transient failure
    pub retries: u64,
    /// Calls that returned parsed JSON
    pub successes: u64,
    /// Calls that ended on HTTP 400
    pub terminal: u64,
    /// Calls that ran out of attempts
    pub exhausted: u64,
}

#[derive(Debug, Default)]
struct Counters {
    calls: AtomicU64,
    requests: AtomicU64,
    retries: AtomicU64,
    successes: AtomicU64,
    terminal: AtomicU64,
    exhausted: AtomicU64,
}

/// HTTP gateway with bounded retry.
///
/// - HTTP 200: the body is parsed as JSON and returned
/// - HTTP 400: the request is malformed; fail at once without retrying
/// - any other status or a network error: retry until the budget is spent
///
/// Callers that only care whether an annotation is available use
/// [`get`](Self::get); [`try_get`](Self::try_get) keeps the failure kind.
pub struct RetryingGateway<T: Transport> {
    transport: T,
    policy: RetryPolicy,
    counters: Counters,
}

impl<T: Transport> RetryingGateway<T> {
    pub fn new(transport: T, policy: RetryPolicy) -> Self {
        Self {
            transport,
            policy,
            counters: Counters::default(),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// GET `url` and parse the JSON body; `None` on any failure.
    pub fn get(&self, url: &str) -> Option<Value> {
        self.try_get(url).ok()
    }

    /// GET `url` and parse the JSON body.
    pub fn try_get(&self, url: &str) -> Result<Value, VepError> {
        self.counters.calls.fetch_add(1, Ordering::Relaxed);
        let attempts = self.policy.attempts();
        let mut last_failure = String::new();

        for attempt in 1..=attempts {
            if attempt > 1 {
                self.counters.retries.fetch_add(1, Ordering::Relaxed);
            }
            self.counters.requests.fetch_add(1, Ordering::Relaxed);

            match self.transport.get(url) {
                Ok(response) if response.status == 200 => {
                    let value = serde_json::from_str(&response.body).map_err(|e| {
                        VepError::malformed(format!("Invalid JSON from {}: {}", url, e))
                    })?;
                    self.counters.successes.fetch_add(1, Ordering::Relaxed);
                    return Ok(value);
                }
                Ok(response) if response.status == 400 => {
                    self.counters.terminal.fetch_add(1, Ordering::Relaxed);
                    error!("Request rejected with HTTP 400: {}", url);
                    return Err(VepError::TerminalRequest {
                        url: url.to_string(),
                        status: response.status,
                    });
                }
                Ok(response) => {
                    last_failure = format!("HTTP {}", response.status);
                }
                Err(e) => {
                    last_failure = e.msg;
                }
            }

            if attempt < attempts {
                let delay = self.policy.delay(attempt);
                warn!(
                    "Attempt {}/{} for {} failed ({}), retrying in {:?}",
                    attempt, attempts, url, last_failure, delay
                );
                if !delay.is_zero() {
                    sleep(delay);
                }
            }
        }

        self.counters.exhausted.fetch_add(1, Ordering::Relaxed);
        error!(
            "Giving up on {} after {} attempts: {}",
            url, attempts, last_failure
        );
        Err(VepError::TransientNetwork {
            url: url.to_string(),
            attempts,
            msg: last_failure,
        })
    }

    /// Snapshot of the request counters
    pub fn stats(&self) -> GatewayStats {
        GatewayStats {
            calls: self.counters.calls.load(Ordering::Relaxed),
            requests: self.counters.requests.load(Ordering::Relaxed),
            retries: self.counters.retries.load(Ordering::Relaxed),
            successes: self.counters.successes.load(Ordering::Relaxed),
            terminal: self.counters.terminal.load(Ordering::Relaxed),
            exhausted: self.counters.exhausted.load(Ordering::Relaxed),
        }
    }
}
