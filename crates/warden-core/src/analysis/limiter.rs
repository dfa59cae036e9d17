//! Request limiter wrapped around every data source call.
//!
//! Each call holds one permit of a semaphore sized to the configured
//! in-flight maximum, runs under a timeout, and is retried with exponential
//! backoff while the error is transient. Once the cancellation token fires no
//! new call starts and in-flight calls resolve to
//! [`DataSourceError::Cancelled`].

use std::future::Future;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use warden_types::config::AuditConfig;
use warden_types::error::DataSourceError;

/// Delay before the first retry; doubled on each further attempt.
pub const DEFAULT_BASE_BACKOFF: Duration = Duration::from_millis(500);

pub struct RequestLimiter {
    permits: Semaphore,
    timeout: Duration,
    max_retries: u32,
    base_backoff: Duration,
    cancel: CancellationToken,
}

impl RequestLimiter {
    pub fn new(
        max_in_flight: usize,
        timeout: Duration,
        max_retries: u32,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            permits: Semaphore::new(max_in_flight.max(1)),
            timeout,
            max_retries,
            base_backoff: DEFAULT_BASE_BACKOFF,
            cancel,
        }
    }

    pub fn from_config(config: &AuditConfig, cancel: CancellationToken) -> Self {
        Self::new(
            config.max_in_flight_requests,
            Duration::from_secs(config.request_timeout_secs),
            config.max_retries,
            cancel,
        )
    }

    pub fn with_base_backoff(mut self, base_backoff: Duration) -> Self {
        self.base_backoff = base_backoff;
        self
    }

    /// Run `request` under the limiter. `operation` names the call in logs.
    pub async fn call<T, F, Fut>(&self, operation: &'static str, mut request: F) -> Result<T, DataSourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, DataSourceError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            if self.cancel.is_cancelled() {
                return Err(DataSourceError::Cancelled);
            }

            let result = {
                let _permit = tokio::select! {
                    permit = self.permits.acquire() => {
                        permit.map_err(|_| DataSourceError::Cancelled)?
                    }
                    _ = self.cancel.cancelled() => return Err(DataSourceError::Cancelled),
                };

                tokio::select! {
                    outcome = tokio::time::timeout(self.timeout, request()) => {
                        outcome.unwrap_or_else(|_| Err(DataSourceError::Timeout(self.timeout.as_secs())))
                    }
                    _ = self.cancel.cancelled() => return Err(DataSourceError::Cancelled),
                }
            };

            match result {
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = self.base_backoff.saturating_mul(2u32.saturating_pow(attempt));
                    attempt += 1;
                    tracing::warn!(
                        operation,
                        attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient data source failure, retrying"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = self.cancel.cancelled() => return Err(DataSourceError::Cancelled),
                    }
                }
                other => return other,
            }
        }
    }
}
