//! Rhino.fi service integration
//!
//! - `types`: 요청/응답 타입
//! - `auth`: 로그인 서명과 인증 헤더
//! - `api`: 원격 서비스 트레이트와 HTTP 구현
//! - `deposit`: 브리지 입금 요청과 전송자 트레이트

mod api;
mod auth;
mod deposit;
mod types;

pub use api::{
    HttpRhinoApi, RhinoApi, BRIDGED_WITHDRAWALS_PATH, RECOVER_TRADING_KEY_PATH, REGISTER_PATH,
    USER_CONFIG_PATH, VAULT_ID_AND_STARK_KEY_PATH,
};
pub use auth::{auth_message, auth_nonce, AuthSession};
pub use deposit::{to_wei, DepositRequest, DepositSubmitter, DEPOSIT_SELECTOR};
pub use types::{
    AuthPayload, BridgeChainConfig, DvfConfig, RecoverMeta, RecoverTradingKeyRequest,
    RecoverTradingKeyResponse, RegisterMeta, RegisterRequest, StoredTradingKey, TokenInfo,
    TransferTx, UserConfig, VaultIdAndStarkKey, WithdrawalRequest,
};
