//! Bounded retry with exponential backoff
//!
//! 호출 측 루프에서 사용합니다:
//!
//! ```rust,ignore
//! let mut backoff = Backoff::new(config.retry());
//! let value = loop {
//!     match operation().await {
//!         Ok(value) => break value,
//!         Err(e) if backoff.wait(&e, "session start").await => continue,
//!         Err(e) => return Err(e),
//!     }
//! };
//! ```

use super::RetryConfig;
use crate::errors::CustodyError;
use std::time::Duration;
use tracing::warn;

/// 재시도 상태
#[derive(Debug, Clone)]
pub struct Backoff {
    config: RetryConfig,
    attempt: u32,
}

impl Backoff {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            config: config.clone(),
            attempt: 1,
        }
    }

    /// 현재 시도 번호 (1부터)
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// 재시도할 에러면 대기 후 `true`를 반환합니다.
    ///
    /// 대기 시간은 서버가 보낸 `Retry-After`가 있으면 그 값, 없으면
    /// [`RetryConfig::delay_for`]이며 둘 다 `max_delay_ms`로 제한됩니다.
    /// 재시도 불가 에러이거나 시도 횟수를 모두 쓴 경우 대기 없이 `false`.
    pub async fn wait(&mut self, error: &CustodyError, operation: &str) -> bool {
        if !error.is_retryable() || self.attempt >= self.config.max_attempts {
            return false;
        }

        let delay_ms = error
            .suggested_retry_after()
            .unwrap_or_else(|| self.config.delay_for(self.attempt))
            .min(self.config.max_delay_ms);

        warn!(
            operation,
            attempt = self.attempt,
            max_attempts = self.config.max_attempts,
            delay_ms,
            code = error.code(),
            "retrying after transient error"
        );

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        self.attempt += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network_error() -> CustodyError {
        CustodyError::NetworkError {
            url: "https://api.rhino.fi".into(),
            message: "connection reset".into(),
        }
    }

    #[tokio::test]
    async fn test_stops_after_max_attempts() {
        let config = RetryConfig {
            max_attempts: 3,
            delay_ms: 0,
            max_delay_ms: 0,
        };
        let mut backoff = Backoff::new(&config);

        assert!(backoff.wait(&network_error(), "test").await);
        assert!(backoff.wait(&network_error(), "test").await);
        assert!(!backoff.wait(&network_error(), "test").await);
        assert_eq!(backoff.attempt(), 3);
    }

    #[tokio::test]
    async fn test_crypto_errors_are_not_retried() {
        let mut backoff = Backoff::new(&RetryConfig::new(5, 0));
        let err = CustodyError::DecryptionFailed {
            message: "MAC mismatch".into(),
        };

        assert!(!backoff.wait(&err, "test").await);
        assert_eq!(backoff.attempt(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_server_hint() {
        let mut backoff = Backoff::new(&RetryConfig::new(2, 10));
        let err = CustodyError::RateLimitExceeded {
            message: "slow down".into(),
            retry_after_ms: Some(5000),
        };

        let started = tokio::time::Instant::now();
        assert!(backoff.wait(&err, "test").await);
        assert!(started.elapsed() >= Duration::from_millis(5000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_configured_delay_without_server_hint() {
        let mut backoff = Backoff::new(&RetryConfig::new(3, 10));
        let err = CustodyError::ExchangeNotAvailable {
            message: "maintenance".into(),
        };

        let started = tokio::time::Instant::now();
        assert!(backoff.wait(&err, "test").await);
        let first = started.elapsed();
        assert!(first >= Duration::from_millis(10));
        assert!(first < Duration::from_millis(20));

        // 지수 증가: 10ms → 20ms
        assert!(backoff.wait(&network_error(), "test").await);
        let second = started.elapsed() - first;
        assert!(second >= Duration::from_millis(20));
        assert!(second < Duration::from_millis(40));
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_hint_is_capped() {
        let config = RetryConfig {
            max_attempts: 2,
            delay_ms: 10,
            max_delay_ms: 100,
        };
        let mut backoff = Backoff::new(&config);
        let err = CustodyError::RateLimitExceeded {
            message: "slow down".into(),
            retry_after_ms: Some(60_000),
        };

        let started = tokio::time::Instant::now();
        assert!(backoff.wait(&err, "test").await);
        assert!(started.elapsed() < Duration::from_millis(1000));
    }
}
