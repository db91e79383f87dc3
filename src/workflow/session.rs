//! Custody Session
//!
//! 한 계정의 등록/복구 → 입금 → 서명된 출금을 순차적으로 진행하는 상태 머신.
//! [`CustodySession::step`]은 정확히 한 번의 전이를 수행하고, 실패하면 세션은
//! [`SessionState::Aborted`]가 되며 실패한 단계 이름을 담은
//! [`CustodyError::Aborted`]를 반환합니다.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::state::SessionState;
use crate::client::{Backoff, RhinoConfig};
use crate::crypto::common::WalletSigner;
use crate::crypto::starkex::{
    dequantize_amount, expiration_timestamp, sign, transfer_amount, verify, StarkKeyPair, StarkSignature,
    TransferOrder, VaultReference,
};
use crate::custody::{TradingKey, TradingKeyCipher};
use crate::errors::{CustodyError, CustodyResult};
use crate::rhino::{
    AuthSession, DepositRequest, DepositSubmitter, RegisterRequest, RhinoApi, TransferTx, UserConfig,
    VaultIdAndStarkKey, WithdrawalRequest,
};

/// StarkEx 전송 nonce 상한 (31비트)
const MAX_TX_NONCE: u64 = (1 << 31) - 1;
/// 출금 요청 nonce 상한 (2^53 - 1)
const MAX_PAYLOAD_NONCE: u64 = (1 << 53) - 1;

/// 완료된 세션 결과
#[derive(Debug, Clone)]
pub struct CustodyReport {
    pub stark_public_key: String,
    pub deposit_tx_hash: String,
    pub withdrawal: WithdrawalRequest,
    pub withdrawal_response: serde_json::Value,
}

/// 계정 하나의 수탁 세션
pub struct CustodySession {
    config: RhinoConfig,
    api: Arc<dyn RhinoApi>,
    wallet: Arc<dyn WalletSigner>,
    depositor: Arc<dyn DepositSubmitter>,
    amount: Decimal,
    rng: StdRng,

    state: SessionState,
    auth: Option<AuthSession>,
    user_config: Option<UserConfig>,
    keys: Option<StarkKeyPair>,
    stark_key: Option<String>,
    /// 입금 시 확정된 10^8 단위 수량; 출금도 같은 값을 사용
    quantized_amount: Option<u64>,
    deposit_tx_hash: Option<String>,
    withdrawal: Option<WithdrawalRequest>,
    signature: Option<StarkSignature>,
    withdrawal_response: Option<serde_json::Value>,
}

impl CustodySession {
    pub fn new(
        config: RhinoConfig,
        api: Arc<dyn RhinoApi>,
        wallet: Arc<dyn WalletSigner>,
        depositor: Arc<dyn DepositSubmitter>,
        amount: Decimal,
    ) -> Self {
        Self {
            config,
            api,
            wallet,
            depositor,
            amount,
            rng: StdRng::from_entropy(),
            state: SessionState::Unregistered,
            auth: None,
            user_config: None,
            keys: None,
            stark_key: None,
            quantized_amount: None,
            deposit_tx_hash: None,
            withdrawal: None,
            signature: None,
            withdrawal_response: None,
        }
    }

    /// 거래 키, nonce 생성에 쓸 난수 생성기 지정
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    // === Getters ===

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn user_config(&self) -> Option<&UserConfig> {
        self.user_config.as_ref()
    }

    /// 등록/복구된 Stark 공개키
    pub fn stark_public_key(&self) -> Option<&str> {
        self.stark_key.as_deref()
    }

    pub fn deposit_tx_hash(&self) -> Option<&str> {
        self.deposit_tx_hash.as_deref()
    }

    /// 서명된 출금 요청 (Withdrawing 이후)
    pub fn withdrawal(&self) -> Option<&WithdrawalRequest> {
        self.withdrawal.as_ref()
    }

    pub fn signature(&self) -> Option<&StarkSignature> {
        self.signature.as_ref()
    }

    /// 한 번의 상태 전이
    pub async fn step(&mut self) -> CustodyResult<SessionState> {
        let from = self.state;
        if from.is_terminal() {
            return Err(CustodyError::InvalidStateTransition {
                state: from.to_string(),
                action: "step".into(),
            });
        }

        let result = match from {
            SessionState::Unregistered => self.start().await,
            SessionState::Registering => self.register().await,
            SessionState::RecoveringKey => self.recover().await,
            SessionState::Ready => self.deposit().await,
            SessionState::Depositing => self.sign_withdrawal().await,
            SessionState::Withdrawing => self.submit_withdrawal().await,
            SessionState::Complete | SessionState::Aborted => unreachable!("terminal states return early"),
        };

        match result {
            Ok(to) => {
                info!(wallet = self.wallet.address(), %from, %to, "session transition");
                self.state = to;
                Ok(to)
            },
            Err(e) => {
                warn!(wallet = self.wallet.address(), stage = %from, code = e.code(), error = %e, "session aborted");
                self.abort();
                Err(e.during(from.as_str()))
            },
        }
    }

    /// `Complete`까지 진행
    pub async fn run(&mut self) -> CustodyResult<CustodyReport> {
        while self.state != SessionState::Complete {
            self.step().await?;
        }
        self.report()
    }

    fn report(&self) -> CustodyResult<CustodyReport> {
        match (
            &self.stark_key,
            &self.deposit_tx_hash,
            &self.withdrawal,
            &self.withdrawal_response,
        ) {
            (Some(stark_key), Some(deposit), Some(withdrawal), Some(response)) => Ok(CustodyReport {
                stark_public_key: stark_key.clone(),
                deposit_tx_hash: deposit.clone(),
                withdrawal: withdrawal.clone(),
                withdrawal_response: response.clone(),
            }),
            _ => Err(self.invalid("report")),
        }
    }

    fn abort(&mut self) {
        self.state = SessionState::Aborted;
        self.keys = None;
    }

    // ========================================================================
    // Session start
    // ========================================================================

    async fn start(&mut self) -> CustodyResult<SessionState> {
        let mut backoff = Backoff::new(self.config.retry());
        loop {
            match self.try_start().await {
                Ok(next) => return Ok(next),
                Err(e) if backoff.wait(&e, "getUserConf").await => continue,
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_start(&mut self) -> CustodyResult<SessionState> {
        let auth = AuthSession::sign_in(self.wallet.as_ref(), Utc::now()).await?;
        let user_config = self.api.get_user_config(&auth).await?;

        let next = if user_config.is_registered {
            info!(wallet = self.wallet.address(), "account registered, recovering trading key");
            SessionState::RecoveringKey
        } else {
            info!(wallet = self.wallet.address(), "new account, starting registration");
            SessionState::Registering
        };

        self.auth = Some(auth);
        self.user_config = Some(user_config);
        Ok(next)
    }

    async fn register(&mut self) -> CustodyResult<SessionState> {
        let mut backoff = Backoff::new(self.config.retry());
        loop {
            let recheck = backoff.attempt() > 1;
            match self.try_register(recheck).await {
                Ok(next) => return Ok(next),
                Err(e) if backoff.wait(&e, "register").await => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// 재시도 시에는 먼저 등록 여부를 다시 확인해 이중 등록을 피합니다.
    async fn try_register(&mut self, recheck: bool) -> CustodyResult<SessionState> {
        let auth = self.auth.clone().ok_or_else(|| self.invalid("register"))?;

        if recheck {
            let user_config = self.api.get_user_config(&auth).await?;
            if user_config.is_registered {
                info!(wallet = self.wallet.address(), "registration already accepted, recovering instead");
                self.user_config = Some(user_config);
                return Ok(SessionState::RecoveringKey);
            }
        }

        let cipher = TradingKeyCipher::from_wallet(self.wallet.as_ref()).await?;
        let (keys, encrypted) = {
            let trading_key = TradingKey::generate(&mut self.rng);
            let keys = StarkKeyPair::from_trading_key(&trading_key)?;
            let encrypted = cipher.encrypt_trading_key(&trading_key, &mut self.rng)?;
            (keys, encrypted)
        };

        let stark_key = keys.public_key_hex();
        let request = RegisterRequest::new(auth.payload(), encrypted, stark_key.clone());
        self.api.register(&auth, &request).await?;

        let user_config = self.api.get_user_config(&auth).await?;
        if let Some(on_file) = user_config.stark_key_hex.as_deref() {
            if !keys.matches_public_key(on_file) {
                return Err(CustodyError::RecoveryMismatch {
                    expected: on_file.to_string(),
                    derived: stark_key,
                });
            }
        }

        debug!(%stark_key, "registered stark key");
        self.user_config = Some(user_config);
        self.keys = Some(keys);
        self.stark_key = Some(stark_key);
        Ok(SessionState::Ready)
    }

    async fn recover(&mut self) -> CustodyResult<SessionState> {
        let mut backoff = Backoff::new(self.config.retry());
        loop {
            match self.try_recover().await {
                Ok(next) => return Ok(next),
                Err(e) if backoff.wait(&e, "recoverTradingKey").await => continue,
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_recover(&mut self) -> CustodyResult<SessionState> {
        let auth = self.auth.clone().ok_or_else(|| self.invalid("recover"))?;
        let expected = self
            .user_config
            .as_ref()
            .ok_or_else(|| self.invalid("recover"))?
            .registered_stark_key()?
            .to_string();

        let encrypted = self.api.recover_trading_key(&auth, self.wallet.address()).await?;
        let cipher = TradingKeyCipher::from_wallet(self.wallet.as_ref()).await?;
        let keys = {
            let trading_key = cipher.decrypt_trading_key(&encrypted)?;
            StarkKeyPair::from_trading_key(&trading_key)?
        };

        if !keys.matches_public_key(&expected) {
            return Err(CustodyError::RecoveryMismatch {
                expected,
                derived: keys.public_key_hex(),
            });
        }

        let stark_key = keys.public_key_hex();
        debug!(%stark_key, "recovered trading key");
        self.keys = Some(keys);
        self.stark_key = Some(stark_key);
        Ok(SessionState::Ready)
    }

    // ========================================================================
    // Transfers
    // ========================================================================

    /// 수량을 먼저 양자화해 출금에 실리지 않을 잔량은 입금하지 않습니다.
    async fn deposit(&mut self) -> CustodyResult<SessionState> {
        let quantized = transfer_amount(self.amount)?;
        let amount = dequantize_amount(quantized);
        if amount != self.amount {
            debug!(requested = %self.amount, %amount, "amount truncated to 8 decimals");
        }

        let chain = self.config.source_chain();
        let bridge = self
            .user_config
            .as_ref()
            .ok_or_else(|| self.invalid("deposit"))?
            .bridge_config(chain)?;

        let request = DepositRequest::new(chain, bridge, amount)?;
        info!(
            wallet = self.wallet.address(),
            chain,
            to = %request.to,
            value_wei = %request.value_wei,
            "submitting bridge deposit"
        );

        let tx_hash = self.depositor.submit_deposit(&request).await?;
        self.quantized_amount = Some(quantized);
        self.deposit_tx_hash = Some(tx_hash);
        Ok(SessionState::Depositing)
    }

    async fn sign_withdrawal(&mut self) -> CustodyResult<SessionState> {
        let auth = self.auth.clone().ok_or_else(|| self.invalid("withdraw"))?;
        let user_config = self.user_config.as_ref().ok_or_else(|| self.invalid("withdraw"))?;

        let token = user_config.token(self.config.token())?;
        let sender_key = user_config
            .stark_key_hex
            .clone()
            .or_else(|| self.stark_key.clone())
            .ok_or_else(|| self.invalid("withdraw"))?;
        let sender = VaultReference::new(token.vault_id()?, sender_key);
        let token_id = token.stark_token_id.clone();
        let target = user_config.dvf.deversifi_address.clone();
        if target.is_empty() {
            return Err(CustodyError::BadResponse {
                message: "DVF.deversifiAddress missing from user config".into(),
            });
        }

        let receiver = self.receiver_vault(&auth, &target).await?;
        let receiver = VaultReference::new(receiver.vault_id, receiver.public_key);

        let amount = self.quantized_amount.ok_or_else(|| self.invalid("withdraw"))?;
        let tx_nonce = self.rng.gen_range(1..=MAX_TX_NONCE);
        let payload_nonce = self.rng.gen_range(1..=MAX_PAYLOAD_NONCE);
        let expiration = expiration_timestamp(Utc::now(), self.config.expiration_window_hours());

        let order = TransferOrder::between(&sender, &receiver, amount, tx_nonce, expiration, &token_id)?;
        let digest = order.digest()?;

        let keys = self.keys.as_ref().ok_or_else(|| self.invalid("sign"))?;
        let signature = sign(keys.private_key(), &digest)?;
        if !verify(keys.public_key(), &digest, &signature)? {
            return Err(CustodyError::InvalidSignature {
                message: "transfer signature failed self-verification".into(),
            });
        }

        self.withdrawal = Some(WithdrawalRequest {
            chain: self.config.destination_chain().to_string(),
            token: self.config.token().to_string(),
            amount: amount.to_string(),
            tx: TransferTx {
                amount,
                sender_public_key: sender.public_key,
                receiver_public_key: receiver.public_key,
                receiver_vault_id: receiver.vault_id,
                sender_vault_id: sender.vault_id,
                signature: signature.to_hex(),
                token: token_id,
                tx_type: "TransferRequest".into(),
                nonce: tx_nonce,
                expiration_timestamp: expiration,
            },
            nonce: payload_nonce,
            recipient_eth_address: self.wallet.address().to_string(),
            is_bridge: false,
        });
        self.signature = Some(signature);
        Ok(SessionState::Withdrawing)
    }

    /// 읽기 전용 조회라 일시적 실패는 재시도합니다.
    async fn receiver_vault(&self, auth: &AuthSession, target: &str) -> CustodyResult<VaultIdAndStarkKey> {
        let mut backoff = Backoff::new(self.config.retry());
        loop {
            match self.api.vault_id_and_stark_key(auth, self.config.token(), target).await {
                Ok(receiver) => return Ok(receiver),
                Err(e) if backoff.wait(&e, "vaultIdAndStarkKey").await => continue,
                Err(e) => return Err(e),
            }
        }
    }

    async fn submit_withdrawal(&mut self) -> CustodyResult<SessionState> {
        let auth = self.auth.clone().ok_or_else(|| self.invalid("withdraw"))?;
        let request = self.withdrawal.as_ref().ok_or_else(|| self.invalid("withdraw"))?;

        info!(
            wallet = self.wallet.address(),
            chain = %request.chain,
            amount = %request.amount,
            "submitting bridged withdrawal"
        );
        let response = self.api.bridged_withdrawal(&auth, request).await?;

        self.withdrawal_response = Some(response);
        self.keys = None;
        Ok(SessionState::Complete)
    }

    fn invalid(&self, action: &str) -> CustodyError {
        CustodyError::InvalidStateTransition {
            state: self.state.to_string(),
            action: action.to_string(),
        }
    }
}

impl std::fmt::Debug for CustodySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustodySession")
            .field("wallet", &self.wallet.address())
            .field("state", &self.state)
            .field("amount", &self.amount)
            .finish()
    }
}
