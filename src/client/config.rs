//! Rhino client configuration

use crate::crypto::starkex::DEFAULT_EXPIRATION_WINDOW_HOURS;
use crate::errors::{CustodyError, CustodyResult};
use std::str::FromStr;

pub const DEFAULT_BASE_URL: &str = "https://api.rhino.fi";

/// 세션 시작 단계 재시도 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// 최대 시도 횟수 (첫 시도 포함, 최소 1)
    pub max_attempts: u32,
    /// 초기 대기 시간 (밀리초)
    pub delay_ms: u64,
    /// 최대 대기 시간 (밀리초)
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 1000,
            max_delay_ms: 30000,
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32, delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay_ms,
            max_delay_ms: RetryConfig::default().max_delay_ms.max(delay_ms),
        }
    }

    /// 재시도 없이 한 번만 시도
    pub fn no_retry() -> Self {
        Self::new(1, 0)
    }

    /// 지수 백오프 대기 시간 (attempt는 1부터)
    pub fn delay_for(&self, attempt: u32) -> u64 {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        self.delay_ms.saturating_mul(factor).min(self.max_delay_ms)
    }
}

/// Rhino 서비스 및 세션 설정
#[derive(Debug, Clone)]
pub struct RhinoConfig {
    base_url: String,
    timeout_ms: u64,
    retry: RetryConfig,
    token: String,
    source_chain: String,
    destination_chain: String,
    expiration_window_hours: u64,
}

impl Default for RhinoConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RhinoConfig {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: 30000,
            retry: RetryConfig::default(),
            token: "ETH".to_string(),
            source_chain: "ZKSYNC".to_string(),
            destination_chain: "ARBITRUM".to_string(),
            expiration_window_hours: DEFAULT_EXPIRATION_WINDOW_HOURS,
        }
    }

    /// 환경 변수에서 설정 읽기
    ///
    /// `RHINO_BASE_URL`, `RHINO_TIMEOUT_MS`, `RHINO_TOKEN`, `RHINO_SOURCE_CHAIN`,
    /// `RHINO_DESTINATION_CHAIN`, `RHINO_EXPIRATION_WINDOW_HOURS`,
    /// `RHINO_RETRY_MAX_ATTEMPTS`, `RHINO_RETRY_DELAY_MS`
    pub fn from_env() -> CustodyResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 임의의 키 조회 함수로 설정 읽기 (없는 키는 기본값 유지)
    pub fn from_lookup<F>(lookup: F) -> CustodyResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::new();

        if let Some(url) = lookup("RHINO_BASE_URL") {
            config = config.with_base_url(url);
        }
        if let Some(timeout) = parse_var(&lookup, "RHINO_TIMEOUT_MS")? {
            config = config.with_timeout(timeout);
        }
        if let Some(token) = lookup("RHINO_TOKEN") {
            config = config.with_token(token);
        }
        if let Some(chain) = lookup("RHINO_SOURCE_CHAIN") {
            config = config.with_source_chain(chain);
        }
        if let Some(chain) = lookup("RHINO_DESTINATION_CHAIN") {
            config = config.with_destination_chain(chain);
        }
        if let Some(hours) = parse_var(&lookup, "RHINO_EXPIRATION_WINDOW_HOURS")? {
            config = config.with_expiration_window_hours(hours);
        }

        let mut retry = config.retry.clone();
        if let Some(attempts) = parse_var::<u32, _>(&lookup, "RHINO_RETRY_MAX_ATTEMPTS")? {
            retry.max_attempts = attempts.max(1);
        }
        if let Some(delay) = parse_var(&lookup, "RHINO_RETRY_DELAY_MS")? {
            retry.delay_ms = delay;
        }

        Ok(config.with_retry(retry))
    }

    /// 베이스 URL 설정 (끝의 `/` 제거)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// 타임아웃 설정 (밀리초)
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    /// 입금 출발 체인 (`bridgeConfigPerChain` 키)
    pub fn with_source_chain(mut self, chain: impl Into<String>) -> Self {
        self.source_chain = chain.into();
        self
    }

    /// 출금 도착 체인
    pub fn with_destination_chain(mut self, chain: impl Into<String>) -> Self {
        self.destination_chain = chain.into();
        self
    }

    pub fn with_expiration_window_hours(mut self, hours: u64) -> Self {
        self.expiration_window_hours = hours;
        self
    }

    // === Getters ===

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    pub fn retry(&self) -> &RetryConfig {
        &self.retry
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn source_chain(&self) -> &str {
        &self.source_chain
    }

    pub fn destination_chain(&self) -> &str {
        &self.destination_chain
    }

    pub fn expiration_window_hours(&self) -> u64 {
        self.expiration_window_hours
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> CustodyResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| CustodyError::ParseError {
                data_type: key.to_string(),
                message: format!("{raw}: {e}"),
            })
        })
        .transpose()
}
