//! Rhino sign-in authentication
//!
//! 지갑으로 고정 문구에 personal_sign 서명하고, 그 서명과 nonce를
//! `Authorization: EcRecover <base64 JSON>` 헤더와 요청 본문에 싣습니다.

use super::types::AuthPayload;
use crate::crypto::common::WalletSigner;
use crate::errors::CustodyResult;
use base64::Engine;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

const NONCE_PREFIX: &str = "v3-";

/// 로그인 서명 문구
pub fn auth_message(now: DateTime<Utc>) -> String {
    format!(
        "To protect your rhino.fi privacy we ask you to sign in with your wallet to see your data.\n\
         Signing in on {} GMT. For your safety, only sign this message on rhino.fi!",
        now.format("%a, %d %b %Y %H:%M:%S")
    )
}

/// `v3-<unix seconds>.<millis>`
pub fn auth_nonce(now: DateTime<Utc>) -> String {
    format!("{NONCE_PREFIX}{}.{:03}", now.timestamp(), now.timestamp_subsec_millis())
}

/// 세션 인증 정보
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    nonce: String,
    signature: String,
}

impl AuthSession {
    pub fn new(nonce: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            nonce: nonce.into(),
            signature: signature.into(),
        }
    }

    /// 지갑으로 로그인 문구에 서명
    pub async fn sign_in(wallet: &dyn WalletSigner, now: DateTime<Utc>) -> CustodyResult<Self> {
        let signature = wallet.sign_message(auth_message(now).as_bytes()).await?;
        Ok(Self::new(auth_nonce(now), signature.to_hex()))
    }

    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub fn payload(&self) -> AuthPayload {
        AuthPayload {
            nonce: self.nonce.clone(),
            signature: self.signature.clone(),
        }
    }

    /// `EcRecover base64({"signature":"0x…","nonce":"v3-…"})`
    pub fn authorization(&self) -> String {
        let json = format!(
            "{{\"signature\":\"{}\",\"nonce\":\"{}\"}}",
            self.signature, self.nonce
        );
        format!(
            "EcRecover {}",
            base64::engine::general_purpose::STANDARD.encode(json.as_bytes())
        )
    }

    pub fn headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("Authorization".to_string(), self.authorization());
        headers.insert("Accept".to_string(), "application/json".to_string());
        headers.insert("Origin".to_string(), "https://app.rhino.fi".to_string());
        headers.insert("Referer".to_string(), "https://app.rhino.fi/".to_string());
        headers
    }
}
