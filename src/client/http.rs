//! HTTP client for API requests

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use super::RhinoConfig;
use crate::errors::{CustodyError, CustodyResult};

/// HTTP 클라이언트
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    /// 새로운 HTTP 클라이언트 생성
    pub fn new(config: &RhinoConfig) -> CustodyResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms()))
            .build()
            .map_err(|e| CustodyError::NetworkError {
                url: config.base_url().to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET 요청
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: Option<HashMap<String, String>>,
        headers: Option<HashMap<String, String>>,
    ) -> CustodyResult<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "GET");

        let mut request = self.client.get(&url);

        if let Some(params) = params {
            request = request.query(&params);
        }

        if let Some(headers) = headers {
            for (key, value) in headers {
                request = request.header(&key, &value);
            }
        }

        let response = request.send().await?;
        Self::parse_response(response, &url).await
    }

    /// POST 요청 (JSON 본문)
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        headers: Option<HashMap<String, String>>,
    ) -> CustodyResult<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "POST");

        let mut request = self.client.post(&url).json(body);

        if let Some(headers) = headers {
            for (key, value) in headers {
                request = request.header(&key, &value);
            }
        }

        let response = request.send().await?;
        Self::parse_response(response, &url).await
    }

    async fn parse_response<T: DeserializeOwned>(response: Response, url: &str) -> CustodyResult<T> {
        let status = response.status();
        if !status.is_success() {
            let retry_after_ms = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000);
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, url, &body, retry_after_ms));
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| CustodyError::ParseError {
            data_type: std::any::type_name::<T>().to_string(),
            message: e.to_string(),
        })
    }
}

/// HTTP 상태 코드를 에러로 변환
pub(crate) fn status_error(
    status: StatusCode,
    url: &str,
    body: &str,
    retry_after_ms: Option<u64>,
) -> CustodyError {
    let message = format!("HTTP {status}: {url} {body}").trim_end().to_string();

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CustodyError::AuthenticationError { message },
        StatusCode::TOO_MANY_REQUESTS => CustodyError::RateLimitExceeded {
            message,
            retry_after_ms,
        },
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => CustodyError::RequestTimeout {
            url: url.to_string(),
        },
        s if s.is_server_error() => CustodyError::ExchangeNotAvailable { message },
        _ => CustodyError::ExchangeError { message },
    }
}
