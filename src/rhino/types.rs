//! Rhino API request/response types

use crate::crypto::starkex::SignatureHex;
use crate::custody::EncryptedTradingKey;
use crate::errors::{CustodyError, CustodyResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 인증 본문 (`nonce`, `signature`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthPayload {
    pub nonce: String,
    pub signature: String,
}

// ============================================================================
// getUserConf
// ============================================================================

/// 사용자 설정
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserConfig {
    pub is_registered: bool,

    /// 등록된 Stark 공개키 (미등록 시 없음)
    #[serde(default)]
    pub stark_key_hex: Option<String>,

    #[serde(default)]
    pub token_registry: HashMap<String, TokenInfo>,

    #[serde(rename = "DVF", default)]
    pub dvf: DvfConfig,
}

impl UserConfig {
    pub fn token(&self, token: &str) -> CustodyResult<&TokenInfo> {
        self.token_registry.get(token).ok_or_else(|| CustodyError::BadResponse {
            message: format!("token {token} missing from tokenRegistry"),
        })
    }

    pub fn bridge_config(&self, chain: &str) -> CustodyResult<&BridgeChainConfig> {
        self.dvf
            .bridge_config_per_chain
            .get(chain)
            .ok_or_else(|| CustodyError::BadResponse {
                message: format!("chain {chain} missing from bridgeConfigPerChain"),
            })
    }

    pub fn registered_stark_key(&self) -> CustodyResult<&str> {
        self.stark_key_hex.as_deref().ok_or_else(|| CustodyError::BadResponse {
            message: "starkKeyHex missing for a registered account".into(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    #[serde(default)]
    pub stark_vault_id: Option<u64>,
    pub stark_token_id: String,
}

impl TokenInfo {
    pub fn vault_id(&self) -> CustodyResult<u64> {
        self.stark_vault_id.ok_or_else(|| CustodyError::BadResponse {
            message: format!("no stark vault for token {}", self.stark_token_id),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DvfConfig {
    #[serde(default)]
    pub deversifi_address: String,

    #[serde(default)]
    pub bridge_config_per_chain: HashMap<String, BridgeChainConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeChainConfig {
    pub contract_address: String,
    #[serde(default)]
    pub enabled: bool,
}

// ============================================================================
// register / recoverTradingKey
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterMeta {
    pub wallet_type: String,
    pub campaign: Option<String>,
    pub referer: Option<String>,
    pub platform: String,
}

impl Default for RegisterMeta {
    fn default() -> Self {
        Self {
            wallet_type: "metamask".into(),
            campaign: None,
            referer: None,
            platform: "DESKTOP".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub encrypted_trading_key: EncryptedTradingKey,
    pub meta: RegisterMeta,
    pub nonce: String,
    pub signature: String,
    pub stark_key: String,
}

impl RegisterRequest {
    pub fn new(auth: AuthPayload, encrypted_trading_key: EncryptedTradingKey, stark_key: impl Into<String>) -> Self {
        Self {
            encrypted_trading_key,
            meta: RegisterMeta::default(),
            nonce: auth.nonce,
            signature: auth.signature,
            stark_key: stark_key.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoverMeta {
    pub eth_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecoverTradingKeyRequest {
    pub nonce: String,
    pub signature: String,
    pub meta: RecoverMeta,
}

/// 서비스가 돌려주는 저장된 거래 키 (문자열 또는 버전 객체)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StoredTradingKey {
    Versioned(EncryptedTradingKey),
    Plain(String),
}

impl StoredTradingKey {
    pub fn into_encrypted(self) -> EncryptedTradingKey {
        match self {
            StoredTradingKey::Versioned(key) => key,
            StoredTradingKey::Plain(dtk) => EncryptedTradingKey::new(dtk),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoverTradingKeyResponse {
    pub encrypted_trading_key: StoredTradingKey,
}

// ============================================================================
// vaultIdAndStarkKey / bridgedWithdrawals
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultIdAndStarkKey {
    pub vault_id: u64,
    pub public_key: String,
}

/// 서명된 TransferRequest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferTx {
    pub amount: u64,
    pub sender_public_key: String,
    pub receiver_public_key: String,
    pub receiver_vault_id: u64,
    pub sender_vault_id: u64,
    pub signature: SignatureHex,
    pub token: String,
    #[serde(rename = "type")]
    pub tx_type: String,
    pub nonce: u64,
    pub expiration_timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRequest {
    pub chain: String,
    pub token: String,
    /// 양자화된 수량 (문자열)
    pub amount: String,
    pub tx: TransferTx,
    pub nonce: u64,
    pub recipient_eth_address: String,
    pub is_bridge: bool,
}
