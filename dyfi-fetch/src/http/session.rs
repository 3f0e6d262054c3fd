//! Shared HTTP session
//!
//! One [`HttpSession`] is built per run and shared by reference across every
//! concurrent task. It wraps a single connection-pooling `reqwest::Client`
//! and applies the [`RetryPolicy`] to each GET.

use super::retry::{parse_retry_after, RetryPolicy};
use crate::error::{FetchError, FetchResult};
use dyfi_common::config::HttpSettings;
use reqwest::header::RETRY_AFTER;
use reqwest::{Method, Response};
use tracing::{debug, info, warn};

/// Connection-reusing client with bounded automatic retry
pub struct HttpSession {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl HttpSession {
    /// Build the session from settings
    ///
    /// The connect timeout bounds connection setup; the request timeout bounds
    /// the whole exchange (connect + read).
    pub fn new(settings: &HttpSettings) -> FetchResult<Self> {
        let policy = RetryPolicy::from_settings(&settings.retry)?;

        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .connect_timeout(settings.connect_timeout())
            .timeout(settings.connect_timeout() + settings.read_timeout())
            .build()
            .map_err(|e| FetchError::Config(format!("HTTP client construction failed: {}", e)))?;

        debug!(
            connect_timeout_ms = settings.connect_timeout_ms,
            read_timeout_ms = settings.read_timeout_ms,
            max_attempts = policy.max_attempts,
            "HTTP session created"
        );

        Ok(Self { client, policy })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// GET `url`, retrying per policy
    ///
    /// Returns the final response whatever its status; callers decide what a
    /// non-success status means for them.
    pub async fn get(&self, url: &str) -> FetchResult<Response> {
        self.get_with_query(url, &[]).await
    }

    /// GET `url` with query parameters, retrying per policy
    pub async fn get_with_query(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> FetchResult<Response> {
        let method = Method::GET;
        let mut attempt: u32 = 1;

        loop {
            let mut request = self.client.request(method.clone(), url);
            if !query.is_empty() {
                request = request.query(query);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if !self.policy.should_retry_status(&method, status, attempt) {
                        if attempt > 1 {
                            debug!(url = %url, attempt, status = status.as_u16(), "Request settled after retry");
                        }
                        return Ok(response);
                    }

                    let hint = response
                        .headers()
                        .get(RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(parse_retry_after);
                    let delay = self.policy.delay_for(attempt, hint);
                    warn!(
                        url = %url,
                        attempt,
                        status = status.as_u16(),
                        delay_ms = delay.as_millis() as u64,
                        "Retryable status, will retry after backoff"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    let err = FetchError::from_reqwest(url, err);
                    if !(err.is_transient() && self.policy.should_retry_transport(&method, attempt)) {
                        return Err(err);
                    }

                    let delay = self.policy.backoff_for(attempt);
                    warn!(
                        url = %url,
                        attempt,
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "Transport failure, will retry after backoff"
                    );
                    tokio::time::sleep(delay).await;
                }
            }

            attempt += 1;
        }
    }

    /// GET `url` and return the body of a successful response
    ///
    /// Non-success statuses become [`FetchError::ResourceFetch`].
    pub async fn get_bytes(&self, url: &str) -> FetchResult<Vec<u8>> {
        let response = self.get(url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::ResourceFetch {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        Ok(body.to_vec())
    }

    /// Tear the session down, closing pooled connections
    ///
    /// Consumes the session so it cannot be closed twice or used afterwards.
    pub fn close(self) {
        drop(self.client);
        info!("HTTP session closed");
    }
}
