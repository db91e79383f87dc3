//! Integration tests for the custody session
//!
//! 원격 서비스와 입금 전송자를 메모리 구현으로 대체해 세션 전체 흐름을 검증합니다.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use std::sync::{Arc, Mutex};

use starkex_custody::crypto::starkex::{parse_felt_hex, verify, StarkSignature};
use starkex_custody::rhino::{AuthSession, RegisterRequest, UserConfig, VaultIdAndStarkKey, WithdrawalRequest};
use starkex_custody::{
    CustodyError, CustodyResult, CustodySession, DepositRequest, DepositSubmitter, EncryptedTradingKey, EvmWallet,
    RetryConfig, RhinoApi, RhinoConfig, SessionState, StarkKeyPair, TradingKey, TradingKeyCipher, TransferOrder,
    WalletSigner,
};

const HARDHAT_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const ETH_TOKEN_ID: &str = "0xb333e3142fe16b78628f19bb15afddaef437e72d6d7f5c6c20c6801a27fba6";
const RECEIVER_KEY: &str = "0x5fa3383597691ea9d827a79e1ab4f07cedb9a5c4d4ae79f06c8b9dd8e7c0e6a";
const SENDER_VAULT: u64 = 1234;
const RECEIVER_VAULT: u64 = 5678;

// === Fakes ===

#[derive(Default)]
struct FakeState {
    stark_key: Option<String>,
    stored: Option<EncryptedTradingKey>,
    user_config_failures: u32,
    recover_failures: u32,
    vault_lookup_failures: u32,
    /// 등록은 반영하되 응답을 잃어버린 것처럼 실패
    lose_register_response: bool,
    register_error: Option<CustodyError>,
    calls: Vec<&'static str>,
    withdrawals: Vec<WithdrawalRequest>,
}

#[derive(Default)]
struct FakeRhino {
    state: Mutex<FakeState>,
}

impl FakeRhino {
    fn registered(stark_key: impl Into<String>, stored: EncryptedTradingKey) -> Self {
        let fake = Self::default();
        {
            let mut state = fake.state.lock().unwrap();
            state.stark_key = Some(stark_key.into());
            state.stored = Some(stored);
        }
        fake
    }

    fn calls(&self, name: &str) -> usize {
        self.state.lock().unwrap().calls.iter().filter(|c| **c == name).count()
    }

    fn withdrawals(&self) -> Vec<WithdrawalRequest> {
        self.state.lock().unwrap().withdrawals.clone()
    }
}

#[async_trait]
impl RhinoApi for FakeRhino {
    async fn get_user_config(&self, _auth: &AuthSession) -> CustodyResult<UserConfig> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("getUserConf");
        if state.user_config_failures > 0 {
            state.user_config_failures -= 1;
            return Err(CustodyError::NetworkError {
                url: "https://api.rhino.fi/v1/trading/r/getUserConf".into(),
                message: "connection reset".into(),
            });
        }

        Ok(serde_json::from_value(json!({
            "isRegistered": state.stark_key.is_some(),
            "starkKeyHex": state.stark_key,
            "tokenRegistry": {
                "ETH": { "starkVaultId": SENDER_VAULT, "starkTokenId": ETH_TOKEN_ID }
            },
            "DVF": {
                "deversifiAddress": "0x5d22045daceab03b158031ecb7d9d06fad24609b",
                "bridgeConfigPerChain": {
                    "ZKSYNC": { "contractAddress": "0x1fa66e2b38d0cc496ec51f81c3e05e6a6708986f", "enabled": true }
                }
            }
        }))
        .unwrap())
    }

    async fn register(&self, _auth: &AuthSession, request: &RegisterRequest) -> CustodyResult<serde_json::Value> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("register");
        if let Some(err) = state.register_error.take() {
            return Err(err);
        }

        state.stark_key = Some(request.stark_key.clone());
        state.stored = Some(request.encrypted_trading_key.clone());
        if std::mem::take(&mut state.lose_register_response) {
            return Err(CustodyError::RequestTimeout {
                url: "https://api.rhino.fi/v1/trading/w/register".into(),
            });
        }
        Ok(json!({ "ok": true }))
    }

    async fn recover_trading_key(&self, _auth: &AuthSession, _eth_address: &str) -> CustodyResult<EncryptedTradingKey> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("recoverTradingKey");
        if state.recover_failures > 0 {
            state.recover_failures -= 1;
            return Err(CustodyError::ExchangeNotAvailable {
                message: "502 Bad Gateway".into(),
            });
        }
        state.stored.clone().ok_or_else(|| CustodyError::BadResponse {
            message: "no stored trading key".into(),
        })
    }

    async fn vault_id_and_stark_key(
        &self,
        _auth: &AuthSession,
        token: &str,
        _target_eth_address: &str,
    ) -> CustodyResult<VaultIdAndStarkKey> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("vaultIdAndStarkKey");
        assert_eq!(token, "ETH");
        if state.vault_lookup_failures > 0 {
            state.vault_lookup_failures -= 1;
            return Err(CustodyError::RequestTimeout {
                url: "https://api.rhino.fi/v1/trading/r/vaultIdAndStarkKey".into(),
            });
        }
        Ok(VaultIdAndStarkKey {
            vault_id: RECEIVER_VAULT,
            public_key: RECEIVER_KEY.into(),
        })
    }

    async fn bridged_withdrawal(
        &self,
        _auth: &AuthSession,
        request: &WithdrawalRequest,
    ) -> CustodyResult<serde_json::Value> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("bridgedWithdrawals");
        state.withdrawals.push(request.clone());
        Ok(json!({ "_id": "withdrawal-1" }))
    }
}

#[derive(Default)]
struct FakeDepositor {
    requests: Mutex<Vec<DepositRequest>>,
}

#[async_trait]
impl DepositSubmitter for FakeDepositor {
    async fn submit_deposit(&self, request: &DepositRequest) -> CustodyResult<String> {
        self.requests.lock().unwrap().push(request.clone());
        Ok("0xdeadbeef".into())
    }
}

// === Helpers ===

fn wallet() -> Arc<EvmWallet> {
    Arc::new(EvmWallet::from_private_key(HARDHAT_KEY).unwrap())
}

fn config(max_attempts: u32) -> RhinoConfig {
    RhinoConfig::new().with_retry(RetryConfig {
        max_attempts,
        delay_ms: 0,
        max_delay_ms: 0,
    })
}

fn session(api: Arc<FakeRhino>, depositor: Arc<FakeDepositor>, amount: Decimal) -> CustodySession {
    CustodySession::new(config(3), api, wallet(), depositor, amount).with_rng(StdRng::seed_from_u64(7))
}

/// 지갑에서 파생한 키로 거래 키를 암호화해 등록된 계정을 만듭니다.
async fn escrowed(trading_key: &TradingKey) -> EncryptedTradingKey {
    let cipher = TradingKeyCipher::from_wallet(wallet().as_ref()).await.unwrap();
    cipher
        .encrypt_trading_key(trading_key, &mut StdRng::seed_from_u64(99))
        .unwrap()
}

fn signature_of(request: &WithdrawalRequest) -> StarkSignature {
    StarkSignature {
        r: parse_felt_hex(&request.tx.signature.r).unwrap(),
        s: parse_felt_hex(&request.tx.signature.s).unwrap(),
    }
}

// === Registration ===

#[tokio::test]
async fn test_new_account_registers_and_completes() {
    let api = Arc::new(FakeRhino::default());
    let depositor = Arc::new(FakeDepositor::default());
    let mut session = session(api.clone(), depositor.clone(), dec!(1.5));

    let report = session.run().await.unwrap();

    assert_eq!(session.state(), SessionState::Complete);
    assert_eq!(api.calls("register"), 1);
    assert_eq!(api.calls("recoverTradingKey"), 0);

    // "0" + 선행 0 없는 hex
    assert!(report.stark_public_key.starts_with('0'));
    assert!(!report.stark_public_key.starts_with("00"));
    assert_eq!(api.state.lock().unwrap().stark_key.as_deref(), Some(report.stark_public_key.as_str()));

    assert_eq!(report.deposit_tx_hash, "0xdeadbeef");
    assert_eq!(report.withdrawal_response["_id"], "withdrawal-1");

    let deposits = depositor.requests.lock().unwrap();
    assert_eq!(deposits.len(), 1);
    assert_eq!(deposits[0].chain, "ZKSYNC");
    assert_eq!(deposits[0].value_wei, 1_500_000_000_000_000_000);
}

#[tokio::test]
async fn test_withdrawal_is_quantized_and_signed() {
    let api = Arc::new(FakeRhino::default());
    let mut session = session(api.clone(), Arc::new(FakeDepositor::default()), dec!(1.5));

    let report = session.run().await.unwrap();
    let withdrawals = api.withdrawals();
    assert_eq!(withdrawals.len(), 1);

    let request = &withdrawals[0];
    assert_eq!(request, &report.withdrawal);
    assert_eq!(request.chain, "ARBITRUM");
    assert_eq!(request.token, "ETH");
    assert_eq!(request.amount, "150000000");
    assert_eq!(request.recipient_eth_address, wallet().address());
    assert!(!request.is_bridge);
    assert!(request.nonce >= 1);

    let tx = &request.tx;
    assert_eq!(tx.amount, 150_000_000);
    assert_eq!(tx.sender_vault_id, SENDER_VAULT);
    assert_eq!(tx.receiver_vault_id, RECEIVER_VAULT);
    assert_eq!(tx.receiver_public_key, RECEIVER_KEY);
    assert_eq!(tx.token, ETH_TOKEN_ID);
    assert_eq!(tx.tx_type, "TransferRequest");
    assert!(tx.nonce >= 1 && tx.nonce < (1 << 31));

    // 서명은 등록된 공개키로 검증되어야 합니다.
    let order = TransferOrder::new(
        tx.sender_vault_id,
        tx.receiver_vault_id,
        tx.amount,
        tx.nonce,
        tx.expiration_timestamp,
        &tx.token,
        &tx.receiver_public_key,
    )
    .unwrap();
    let public_key = parse_felt_hex(&report.stark_public_key).unwrap();
    assert!(verify(&public_key, &order.digest().unwrap(), &signature_of(request)).unwrap());
    assert_eq!(session.signature(), Some(&signature_of(request)));
}

#[tokio::test]
async fn test_lost_register_response_recovers_instead_of_registering_twice() {
    let api = Arc::new(FakeRhino::default());
    api.state.lock().unwrap().lose_register_response = true;
    let mut session = session(api.clone(), Arc::new(FakeDepositor::default()), dec!(0.01));

    let report = session.run().await.unwrap();

    assert_eq!(api.calls("register"), 1);
    assert_eq!(api.calls("recoverTradingKey"), 1);
    assert_eq!(api.state.lock().unwrap().stark_key.as_deref(), Some(report.stark_public_key.as_str()));
}

#[tokio::test]
async fn test_permanent_register_error_is_not_retried() {
    let api = Arc::new(FakeRhino::default());
    api.state.lock().unwrap().register_error = Some(CustodyError::AuthenticationError {
        message: "signature rejected".into(),
    });
    let mut session = session(api.clone(), Arc::new(FakeDepositor::default()), dec!(0.01));

    let err = session.run().await.unwrap_err();

    assert_eq!(session.state(), SessionState::Aborted);
    assert_eq!(err.stage(), Some("registering"));
    assert_eq!(err.root_cause().code(), "AUTHENTICATION_ERROR");
    assert_eq!(api.calls("register"), 1);
    assert!(session.stark_public_key().is_none());
}

// === Recovery ===

#[tokio::test]
async fn test_registered_account_recovers_trading_key() {
    let trading_key = TradingKey::from_bytes([7u8; 32]);
    let keys = StarkKeyPair::from_trading_key(&trading_key).unwrap();
    // 서비스는 접두사와 선행 0 형식이 다를 수 있습니다.
    let on_file = format!("0x{}", keys.public_key_hex().trim_start_matches('0'));

    let api = Arc::new(FakeRhino::registered(on_file, escrowed(&trading_key).await));
    let depositor = Arc::new(FakeDepositor::default());
    let mut session = session(api.clone(), depositor, dec!(0.25));

    assert_eq!(session.step().await.unwrap(), SessionState::RecoveringKey);
    assert_eq!(session.step().await.unwrap(), SessionState::Ready);
    assert_eq!(session.stark_public_key(), Some(keys.public_key_hex().as_str()));

    let report = session.run().await.unwrap();
    assert_eq!(api.calls("register"), 0);
    assert_eq!(report.withdrawal.amount, "25000000");

    let request = &api.withdrawals()[0];
    let order = TransferOrder::new(
        request.tx.sender_vault_id,
        request.tx.receiver_vault_id,
        request.tx.amount,
        request.tx.nonce,
        request.tx.expiration_timestamp,
        &request.tx.token,
        &request.tx.receiver_public_key,
    )
    .unwrap();
    assert!(verify(keys.public_key(), &order.digest().unwrap(), &signature_of(request)).unwrap());
}

#[tokio::test]
async fn test_recovery_mismatch_aborts_before_signing() {
    let stored_key = TradingKey::from_bytes([7u8; 32]);
    let other = StarkKeyPair::from_trading_key(&TradingKey::from_bytes([8u8; 32])).unwrap();

    let api = Arc::new(FakeRhino::registered(other.public_key_hex(), escrowed(&stored_key).await));
    let depositor = Arc::new(FakeDepositor::default());
    let mut session = session(api.clone(), depositor.clone(), dec!(0.25));

    let err = session.run().await.unwrap_err();

    assert_eq!(session.state(), SessionState::Aborted);
    assert_eq!(err.stage(), Some("recovering_key"));
    assert_eq!(err.root_cause().code(), "RECOVERY_MISMATCH");
    assert!(err.is_crypto_error());
    assert!(session.signature().is_none());
    assert!(session.withdrawal().is_none());
    assert!(depositor.requests.lock().unwrap().is_empty());
    assert!(api.withdrawals().is_empty());
}

#[tokio::test]
async fn test_corrupted_escrow_aborts_without_retry() {
    let keys = StarkKeyPair::from_trading_key(&TradingKey::from_bytes([7u8; 32])).unwrap();
    let api = Arc::new(FakeRhino::registered(keys.public_key_hex(), EncryptedTradingKey::new("00ff")));
    let mut session = session(api.clone(), Arc::new(FakeDepositor::default()), dec!(0.25));

    let err = session.run().await.unwrap_err();

    assert_eq!(err.stage(), Some("recovering_key"));
    assert_eq!(err.root_cause().code(), "DECRYPTION_FAILED");
    assert_eq!(api.calls("recoverTradingKey"), 1);
}

// === Retry ===

#[tokio::test]
async fn test_transient_user_config_failure_is_retried() {
    let api = Arc::new(FakeRhino::default());
    api.state.lock().unwrap().user_config_failures = 2;
    let mut session = session(api.clone(), Arc::new(FakeDepositor::default()), dec!(0.01));

    assert_eq!(session.step().await.unwrap(), SessionState::Registering);
    assert_eq!(api.calls("getUserConf"), 3);
}

#[tokio::test]
async fn test_transient_recover_failure_is_retried() {
    let trading_key = TradingKey::from_bytes([7u8; 32]);
    let keys = StarkKeyPair::from_trading_key(&trading_key).unwrap();
    let api = Arc::new(FakeRhino::registered(keys.public_key_hex(), escrowed(&trading_key).await));
    api.state.lock().unwrap().recover_failures = 1;
    let mut session = session(api.clone(), Arc::new(FakeDepositor::default()), dec!(0.25));

    let report = session.run().await.unwrap();

    assert_eq!(session.state(), SessionState::Complete);
    assert_eq!(api.calls("recoverTradingKey"), 2);
    assert_eq!(report.stark_public_key, keys.public_key_hex());
}

#[tokio::test]
async fn test_recover_gives_up_after_max_attempts() {
    let trading_key = TradingKey::from_bytes([7u8; 32]);
    let keys = StarkKeyPair::from_trading_key(&trading_key).unwrap();
    let api = Arc::new(FakeRhino::registered(keys.public_key_hex(), escrowed(&trading_key).await));
    api.state.lock().unwrap().recover_failures = 10;
    let mut session = session(api.clone(), Arc::new(FakeDepositor::default()), dec!(0.25));

    let err = session.run().await.unwrap_err();

    assert_eq!(err.stage(), Some("recovering_key"));
    assert_eq!(err.root_cause().code(), "EXCHANGE_NOT_AVAILABLE");
    assert_eq!(api.calls("recoverTradingKey"), 3);
}

#[tokio::test]
async fn test_transient_vault_lookup_failure_is_retried() {
    let api = Arc::new(FakeRhino::default());
    api.state.lock().unwrap().vault_lookup_failures = 2;
    let depositor = Arc::new(FakeDepositor::default());
    let mut session = session(api.clone(), depositor.clone(), dec!(0.01));

    session.run().await.unwrap();

    assert_eq!(api.calls("vaultIdAndStarkKey"), 3);
    assert_eq!(depositor.requests.lock().unwrap().len(), 1);
    assert_eq!(api.withdrawals()[0].tx.receiver_vault_id, RECEIVER_VAULT);
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let api = Arc::new(FakeRhino::default());
    api.state.lock().unwrap().user_config_failures = 10;
    let mut session = CustodySession::new(config(2), api.clone(), wallet(), Arc::new(FakeDepositor::default()), dec!(0.01));

    let err = session.step().await.unwrap_err();

    assert_eq!(session.state(), SessionState::Aborted);
    assert_eq!(err.stage(), Some("unregistered"));
    assert_eq!(err.root_cause().code(), "NETWORK_ERROR");
    assert_eq!(api.calls("getUserConf"), 2);
}

// === Invalid input and transitions ===

#[tokio::test]
async fn test_unrepresentable_amount_aborts() {
    let api = Arc::new(FakeRhino::default());
    let depositor = Arc::new(FakeDepositor::default());
    let mut session = session(api.clone(), depositor.clone(), dec!(100000000000));

    let err = session.run().await.unwrap_err();

    assert_eq!(err.stage(), Some("ready"));
    assert_eq!(err.root_cause().code(), "FIELD_OVERFLOW");
    assert!(depositor.requests.lock().unwrap().is_empty());
    assert!(api.withdrawals().is_empty());
}

#[tokio::test]
async fn test_dust_amount_aborts_before_deposit() {
    let api = Arc::new(FakeRhino::default());
    let depositor = Arc::new(FakeDepositor::default());
    let mut session = session(api.clone(), depositor.clone(), dec!(0.000000009));

    let err = session.run().await.unwrap_err();

    assert_eq!(session.state(), SessionState::Aborted);
    assert_eq!(err.stage(), Some("ready"));
    assert_eq!(err.root_cause().code(), "INVALID_AMOUNT");
    assert!(depositor.requests.lock().unwrap().is_empty());
    assert!(session.signature().is_none());
    assert!(api.withdrawals().is_empty());
}

#[tokio::test]
async fn test_deposit_matches_quantized_withdrawal() {
    let api = Arc::new(FakeRhino::default());
    let depositor = Arc::new(FakeDepositor::default());
    let mut session = session(api.clone(), depositor.clone(), dec!(1.500000009));

    let report = session.run().await.unwrap();

    // 10^-8 미만 잔량은 입금하지 않습니다.
    assert_eq!(depositor.requests.lock().unwrap()[0].value_wei, 1_500_000_000_000_000_000);
    assert_eq!(report.withdrawal.amount, "150000000");
    assert_eq!(report.withdrawal.tx.amount, 150_000_000);
}

#[tokio::test]
async fn test_step_after_completion_is_rejected() {
    let api = Arc::new(FakeRhino::default());
    let mut session = session(api.clone(), Arc::new(FakeDepositor::default()), dec!(0.01));
    session.run().await.unwrap();

    let err = session.step().await.unwrap_err();

    assert_eq!(err.code(), "INVALID_STATE_TRANSITION");
    assert_eq!(session.state(), SessionState::Complete);
    assert_eq!(api.calls("bridgedWithdrawals"), 1);
}

#[tokio::test]
async fn test_step_after_abort_is_rejected() {
    let api = Arc::new(FakeRhino::default());
    api.state.lock().unwrap().user_config_failures = 10;
    let mut session = CustodySession::new(config(1), api.clone(), wallet(), Arc::new(FakeDepositor::default()), dec!(0.01));

    assert!(session.step().await.is_err());
    let err = session.step().await.unwrap_err();

    assert!(matches!(err, CustodyError::InvalidStateTransition { .. }));
    assert_eq!(api.calls("getUserConf"), 1);
}
