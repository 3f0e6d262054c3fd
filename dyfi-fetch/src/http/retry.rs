//! Retry policy for idempotent HTTP requests
//!
//! Kept independent of the HTTP client so the decision logic can be tested on
//! its own. The session consults it after every attempt.
//!
//! **Backoff schedule** (retry `n`, 1-based):
//! - n = 1: no delay
//! - n >= 2: `backoff_factor * 2^(n-2)`, capped at [`BACKOFF_MAX`]
//!
//! With the default factor of 1s that is 0s, 1s, 2s, 4s, ...

use crate::error::{FetchError, FetchResult};
use dyfi_common::config::RetrySettings;
use reqwest::{Method, StatusCode};
use std::time::Duration;

/// Upper bound on a single backoff delay, including server Retry-After hints
pub const BACKOFF_MAX: Duration = Duration::from_secs(120);

/// Which failures are retried, how often, and how long to wait in between
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Attempts in total, including the first
    pub max_attempts: u32,
    pub backoff_factor: Duration,
    pub retry_statuses: Vec<StatusCode>,
    pub allowed_methods: Vec<Method>,
}

impl RetryPolicy {
    pub fn from_settings(settings: &RetrySettings) -> FetchResult<Self> {
        let retry_statuses = settings
            .retry_statuses
            .iter()
            .map(|code| {
                StatusCode::from_u16(*code)
                    .map_err(|_| FetchError::Config(format!("invalid retry status {}", code)))
            })
            .collect::<FetchResult<Vec<_>>>()?;

        let allowed_methods = settings
            .allowed_methods
            .iter()
            .map(|name| {
                Method::from_bytes(name.trim().to_ascii_uppercase().as_bytes())
                    .map_err(|_| FetchError::Config(format!("invalid retry method {:?}", name)))
            })
            .collect::<FetchResult<Vec<_>>>()?;

        Ok(Self {
            max_attempts: settings.max_attempts.max(1),
            backoff_factor: Duration::from_millis(settings.backoff_factor_ms),
            retry_statuses,
            allowed_methods,
        })
    }

    pub fn is_method_retryable(&self, method: &Method) -> bool {
        self.allowed_methods.contains(method)
    }

    /// Retry after `attempt` (1-based) answered with `status`?
    pub fn should_retry_status(&self, method: &Method, status: StatusCode, attempt: u32) -> bool {
        attempt < self.max_attempts
            && self.is_method_retryable(method)
            && self.retry_statuses.contains(&status)
    }

    /// Retry after `attempt` (1-based) failed at the transport level?
    pub fn should_retry_transport(&self, method: &Method, attempt: u32) -> bool {
        attempt < self.max_attempts && self.is_method_retryable(method)
    }

    /// Delay before retry `retry` (1-based)
    pub fn backoff_for(&self, retry: u32) -> Duration {
        if retry <= 1 {
            return Duration::ZERO;
        }
        let exponent = (retry - 2).min(16);
        self.backoff_factor
            .saturating_mul(1u32 << exponent)
            .min(BACKOFF_MAX)
    }

    /// Delay before retry `retry`, honouring a server `Retry-After` hint
    pub fn delay_for(&self, retry: u32, retry_after: Option<Duration>) -> Duration {
        let backoff = self.backoff_for(retry);
        match retry_after {
            Some(hint) => hint.max(backoff).min(BACKOFF_MAX),
            None => backoff,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_factor: Duration::from_secs(1),
            retry_statuses: [429, 500, 502, 503, 504]
                .into_iter()
                .filter_map(|c| StatusCode::from_u16(c).ok())
                .collect(),
            allowed_methods: vec![Method::HEAD, Method::GET, Method::OPTIONS],
        }
    }
}

/// Parse a `Retry-After` header given in whole seconds
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
