//! Base HTTP plumbing: rate limiting and error classification.

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};

use crate::errors::{DirectoryError, DirectoryResult};

/// Spaces requests so the directory API's per-minute budget is respected.
/// One request at a time; the permit is held for the duration of the send.
pub struct RateLimiter {
    semaphore: Arc<Semaphore>,
    last_request: Arc<Mutex<Option<Instant>>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(max_per_minute: usize) -> Self {
        let min_interval = if max_per_minute > 0 {
            Duration::from_secs_f64(60.0 / max_per_minute as f64)
        } else {
            Duration::ZERO
        };

        Self {
            semaphore: Arc::new(Semaphore::new(1)),
            last_request: Arc::new(Mutex::new(None)),
            min_interval,
        }
    }

    pub async fn acquire(&self) -> DirectoryResult<RateLimitGuard> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|err| DirectoryError::Network(format!("rate limiter closed: {}", err)))?;

        if !self.min_interval.is_zero() {
            let mut last = self.last_request.lock().await;
            let now = Instant::now();

            if let Some(last_time) = *last {
                let elapsed = last_time.elapsed();
                if elapsed < self.min_interval {
                    let wait = self.min_interval - elapsed;
                    drop(last);
                    tokio::time::sleep(wait).await;
                    let mut relocked = self.last_request.lock().await;
                    *relocked = Some(Instant::now());
                } else {
                    *last = Some(now);
                }
            } else {
                *last = Some(now);
            }
        }

        Ok(RateLimitGuard { _permit: permit })
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

/// RAII guard returned by [`RateLimiter::acquire`]
pub struct RateLimitGuard {
    _permit: OwnedSemaphorePermit,
}

/// Thin reqwest wrapper holding the default request timeout.
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(timeout_secs: u64) -> DirectoryResult<Self> {
        if timeout_secs == 0 {
            return Err(DirectoryError::Network(
                "timeout must be greater than zero".to_string(),
            ));
        }

        let client = Client::builder()
            .build()
            .map_err(|err| DirectoryError::Network(format!("failed to create client: {}", err)))?;

        Ok(Self {
            client,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Map a transport failure onto the error taxonomy.
    pub fn classify(err: reqwest::Error, timeout: Duration) -> DirectoryError {
        if err.is_timeout() {
            DirectoryError::Timeout {
                seconds: timeout.as_secs(),
            }
        } else {
            DirectoryError::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn limiter_spaces_consecutive_requests() {
        let limiter = RateLimiter::new(1200); // 50ms interval
        let start = Instant::now();

        drop(limiter.acquire().await.expect("first"));
        drop(limiter.acquire().await.expect("second"));

        assert!(start.elapsed() >= limiter.min_interval());
    }

    #[test]
    fn zero_rate_means_no_spacing() {
        let limiter = RateLimiter::new(0);
        assert!(limiter.min_interval().is_zero());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        assert!(HttpClient::new(0).is_err());
    }
}
