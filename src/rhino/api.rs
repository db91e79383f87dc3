//! Rhino Remote Service API
//!
//! 세션이 의존하는 원격 서비스 호출. 테스트에서는 메모리 구현으로 대체합니다.

use async_trait::async_trait;
use std::collections::HashMap;
use tracing::info;

use super::auth::AuthSession;
use super::types::{
    RecoverMeta, RecoverTradingKeyRequest, RecoverTradingKeyResponse, RegisterRequest, UserConfig,
    VaultIdAndStarkKey, WithdrawalRequest,
};
use crate::client::{HttpClient, RhinoConfig};
use crate::custody::EncryptedTradingKey;
use crate::errors::CustodyResult;

pub const USER_CONFIG_PATH: &str = "/v1/trading/r/getUserConf";
pub const REGISTER_PATH: &str = "/v1/trading/w/register";
pub const RECOVER_TRADING_KEY_PATH: &str = "/v1/trading/r/recoverTradingKey";
pub const VAULT_ID_AND_STARK_KEY_PATH: &str = "/v1/trading/r/vaultIdAndStarkKey";
pub const BRIDGED_WITHDRAWALS_PATH: &str = "/v1/trading/bridgedWithdrawals";

/// Rhino 원격 서비스
#[async_trait]
pub trait RhinoApi: Send + Sync {
    // ========================================================================
    // Registration
    // ========================================================================

    /// 등록 여부와 계정 설정 조회
    async fn get_user_config(&self, auth: &AuthSession) -> CustodyResult<UserConfig>;

    /// 암호화된 거래 키와 Stark 공개키 등록
    async fn register(&self, auth: &AuthSession, request: &RegisterRequest) -> CustodyResult<serde_json::Value>;

    /// 저장된 암호화 거래 키 조회
    async fn recover_trading_key(&self, auth: &AuthSession, eth_address: &str) -> CustodyResult<EncryptedTradingKey>;

    // ========================================================================
    // Transfers
    // ========================================================================

    /// 대상 주소의 볼트 ID와 Stark 공개키 조회
    async fn vault_id_and_stark_key(
        &self,
        auth: &AuthSession,
        token: &str,
        target_eth_address: &str,
    ) -> CustodyResult<VaultIdAndStarkKey>;

    /// 서명된 전송으로 브리지 출금 요청
    async fn bridged_withdrawal(
        &self,
        auth: &AuthSession,
        request: &WithdrawalRequest,
    ) -> CustodyResult<serde_json::Value>;
}

/// reqwest 기반 구현
pub struct HttpRhinoApi {
    http: HttpClient,
}

impl HttpRhinoApi {
    pub fn new(config: &RhinoConfig) -> CustodyResult<Self> {
        Ok(Self {
            http: HttpClient::new(config)?,
        })
    }
}

#[async_trait]
impl RhinoApi for HttpRhinoApi {
    async fn get_user_config(&self, auth: &AuthSession) -> CustodyResult<UserConfig> {
        self.http
            .post(USER_CONFIG_PATH, &auth.payload(), Some(auth.headers()))
            .await
    }

    async fn register(&self, auth: &AuthSession, request: &RegisterRequest) -> CustodyResult<serde_json::Value> {
        info!(stark_key = %request.stark_key, "registering trading key");
        self.http.post(REGISTER_PATH, request, Some(auth.headers())).await
    }

    async fn recover_trading_key(&self, auth: &AuthSession, eth_address: &str) -> CustodyResult<EncryptedTradingKey> {
        let request = RecoverTradingKeyRequest {
            nonce: auth.nonce().to_string(),
            signature: auth.signature().to_string(),
            meta: RecoverMeta {
                eth_address: eth_address.to_string(),
            },
        };

        let response: RecoverTradingKeyResponse = self
            .http
            .post(RECOVER_TRADING_KEY_PATH, &request, Some(auth.headers()))
            .await?;
        Ok(response.encrypted_trading_key.into_encrypted())
    }

    async fn vault_id_and_stark_key(
        &self,
        auth: &AuthSession,
        token: &str,
        target_eth_address: &str,
    ) -> CustodyResult<VaultIdAndStarkKey> {
        let mut params = HashMap::new();
        params.insert("token".to_string(), token.to_string());
        params.insert("targetEthAddress".to_string(), target_eth_address.to_string());

        self.http
            .get(VAULT_ID_AND_STARK_KEY_PATH, Some(params), Some(auth.headers()))
            .await
    }

    async fn bridged_withdrawal(
        &self,
        auth: &AuthSession,
        request: &WithdrawalRequest,
    ) -> CustodyResult<serde_json::Value> {
        self.http
            .post(BRIDGED_WITHDRAWALS_PATH, request, Some(auth.headers()))
            .await
    }
}
