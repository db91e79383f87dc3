//! Custody Error Hierarchy
//!
//! Every fallible operation in the crate returns [`CustodyResult`].
//!
//! Error families:
//! - Transient (retryable at the session-start granularity)
//!   - NetworkError
//!   - RequestTimeout
//!   - RateLimitExceeded
//!   - ExchangeNotAvailable
//! - Protocol (remote service answered, but not the way we expected)
//!   - ExchangeError
//!   - AuthenticationError
//!   - BadResponse
//!   - ParseError
//!   - JsonError
//!   - InvalidStateTransition
//! - Cryptographic integrity (always fatal)
//!   - InvalidSignature
//!   - InvalidPrivateKey
//!   - DecryptionFailed
//!   - RecoveryMismatch
//!   - FieldOverflow
//!   - DegenerateNonce
//!   - InvalidAmount
//! - Aborted (a workflow stage failed; wraps one of the above)

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CustodyError {
    // === Transient family ===
    /// Generic network error
    #[error("Network error: {url} - {message}")]
    NetworkError { url: String, message: String },

    /// Request timed out
    #[error("Request timeout: {url}")]
    RequestTimeout { url: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {message}")]
    RateLimitExceeded {
        message: String,
        /// Suggested retry after in milliseconds (if provided by the service)
        retry_after_ms: Option<u64>,
    },

    /// Service is temporarily unavailable (5xx)
    #[error("Exchange not available: {message}")]
    ExchangeNotAvailable { message: String },

    // === Protocol family ===
    /// The service rejected the request
    #[error("Exchange error: {message}")]
    ExchangeError { message: String },

    /// Authentication header was refused
    #[error("Authentication error: {message}")]
    AuthenticationError { message: String },

    /// Response had an unexpected shape or content
    #[error("Bad response: {message}")]
    BadResponse { message: String },

    /// Failed to parse response data
    #[error("Parse error: {data_type} - {message}")]
    ParseError { data_type: String, message: String },

    /// JSON parsing error
    #[error("JSON error: {message}")]
    JsonError { message: String },

    /// Session asked to do something its current state does not allow
    #[error("Invalid state transition: cannot {action} from {state}")]
    InvalidStateTransition { state: String, action: String },

    // === Cryptographic family ===
    /// Invalid or unverifiable signature
    #[error("Invalid signature: {message}")]
    InvalidSignature { message: String },

    /// Invalid private key or key seed
    #[error("Invalid private key: {message}")]
    InvalidPrivateKey { message: String },

    /// ECIES decryption or envelope parsing failed
    #[error("Decryption failed: {message}")]
    DecryptionFailed { message: String },

    /// Recovered trading key derives a different stark key than the one on file
    #[error("Recovered stark key {derived} does not match registered key {expected}")]
    RecoveryMismatch { expected: String, derived: String },

    /// A transfer field does not fit its bit width
    #[error("Field overflow: {field} = {value} does not fit in {bits} bits")]
    FieldOverflow {
        field: &'static str,
        value: String,
        bits: u32,
    },

    /// Signing nonce kept producing a degenerate signature
    #[error("Degenerate signing nonce after {attempts} attempts")]
    DegenerateNonce { attempts: u32 },

    /// Amount cannot be represented in the 8-decimal fixed point form
    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },

    // === Workflow ===
    /// A workflow stage failed and the session was aborted
    #[error("Session aborted during {stage}: {source}")]
    Aborted {
        stage: String,
        #[source]
        source: Box<CustodyError>,
    },
}

impl CustodyError {
    /// Returns the error code as a string constant
    pub fn code(&self) -> &'static str {
        match self {
            CustodyError::NetworkError { .. } => "NETWORK_ERROR",
            CustodyError::RequestTimeout { .. } => "REQUEST_TIMEOUT",
            CustodyError::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            CustodyError::ExchangeNotAvailable { .. } => "EXCHANGE_NOT_AVAILABLE",
            CustodyError::ExchangeError { .. } => "EXCHANGE_ERROR",
            CustodyError::AuthenticationError { .. } => "AUTHENTICATION_ERROR",
            CustodyError::BadResponse { .. } => "BAD_RESPONSE",
            CustodyError::ParseError { .. } => "PARSE_ERROR",
            CustodyError::JsonError { .. } => "JSON_ERROR",
            CustodyError::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            CustodyError::InvalidSignature { .. } => "INVALID_SIGNATURE",
            CustodyError::InvalidPrivateKey { .. } => "INVALID_PRIVATE_KEY",
            CustodyError::DecryptionFailed { .. } => "DECRYPTION_FAILED",
            CustodyError::RecoveryMismatch { .. } => "RECOVERY_MISMATCH",
            CustodyError::FieldOverflow { .. } => "FIELD_OVERFLOW",
            CustodyError::DegenerateNonce { .. } => "DEGENERATE_NONCE",
            CustodyError::InvalidAmount { .. } => "INVALID_AMOUNT",
            CustodyError::Aborted { .. } => "ABORTED",
        }
    }

    /// Returns true if this error is temporary and the operation can be retried
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CustodyError::NetworkError { .. }
                | CustodyError::RequestTimeout { .. }
                | CustodyError::RateLimitExceeded { .. }
                | CustodyError::ExchangeNotAvailable { .. }
        )
    }

    /// Returns true for integrity failures that must abort immediately
    pub fn is_crypto_error(&self) -> bool {
        match self {
            CustodyError::InvalidSignature { .. }
            | CustodyError::InvalidPrivateKey { .. }
            | CustodyError::DecryptionFailed { .. }
            | CustodyError::RecoveryMismatch { .. }
            | CustodyError::FieldOverflow { .. }
            | CustodyError::DegenerateNonce { .. }
            | CustodyError::InvalidAmount { .. } => true,
            CustodyError::Aborted { source, .. } => source.is_crypto_error(),
            _ => false,
        }
    }

    /// Retry delay in milliseconds announced by the server (`Retry-After`), if any
    ///
    /// 서버 힌트가 없으면 `None`이며, 재시도 간격은 `RetryConfig`가 정합니다.
    pub fn suggested_retry_after(&self) -> Option<u64> {
        match self {
            CustodyError::RateLimitExceeded { retry_after_ms, .. } => *retry_after_ms,
            _ => None,
        }
    }

    /// Wraps this error as the cause of an aborted stage
    pub fn during(self, stage: impl Into<String>) -> Self {
        CustodyError::Aborted {
            stage: stage.into(),
            source: Box::new(self),
        }
    }

    /// Name of the stage that aborted, if any
    pub fn stage(&self) -> Option<&str> {
        match self {
            CustodyError::Aborted { stage, .. } => Some(stage),
            _ => None,
        }
    }

    /// The innermost error, looking through `Aborted` wrappers
    pub fn root_cause(&self) -> &CustodyError {
        match self {
            CustodyError::Aborted { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

// === From implementations for common error types ===

impl From<serde_json::Error> for CustodyError {
    fn from(err: serde_json::Error) -> Self {
        CustodyError::JsonError {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for CustodyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CustodyError::RequestTimeout {
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else if err.is_connect() {
            CustodyError::NetworkError {
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
                message: "Connection failed".into(),
            }
        } else if err.is_decode() {
            CustodyError::ParseError {
                data_type: "response body".into(),
                message: err.to_string(),
            }
        } else {
            CustodyError::NetworkError {
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
                message: err.to_string(),
            }
        }
    }
}

/// Result 타입 alias
pub type CustodyResult<T> = Result<T, CustodyError>;
