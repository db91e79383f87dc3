//! EVM Wallet
//!
//! 로컬 개인키로 동작하는 [`WalletSigner`] 구현입니다.

use super::eip712::Eip712TypedData;
use super::keccak::keccak256;
use super::secp256k1::{parse_private_key, private_key_to_address, sign_hash, signing_key_from_bytes};
use crate::crypto::common::{Signature, WalletSigner};
use crate::errors::CustodyResult;
use async_trait::async_trait;
use k256::ecdsa::SigningKey;

/// EVM 지갑
///
/// # Example
///
/// ```rust,ignore
/// use starkex_custody::crypto::evm::EvmWallet;
///
/// let wallet = EvmWallet::from_private_key("0x...")?;
/// println!("Address: {}", wallet.address());
/// ```
pub struct EvmWallet {
    signing_key: SigningKey,
    /// 체크섬 형식의 주소
    address: String,
}

impl EvmWallet {
    /// Hex 개인키에서 지갑 생성 (0x 접두사 선택)
    pub fn from_private_key(private_key: &str) -> CustodyResult<Self> {
        Self::from_bytes(&parse_private_key(private_key)?)
    }

    /// 바이트 배열에서 지갑 생성
    pub fn from_bytes(private_key: &[u8; 32]) -> CustodyResult<Self> {
        Ok(Self {
            signing_key: signing_key_from_bytes(private_key)?,
            address: private_key_to_address(private_key)?,
        })
    }

    /// personal_sign 서명 (동기)
    pub fn sign_message_sync(&self, message: &[u8]) -> CustodyResult<Signature> {
        sign_hash(&self.signing_key, &personal_sign_hash(message))
    }

    /// EIP-712 서명 (동기)
    pub fn sign_typed_data_sync(&self, typed_data: &Eip712TypedData) -> CustodyResult<Signature> {
        sign_hash(&self.signing_key, &typed_data.sign_hash()?)
    }
}

#[async_trait]
impl WalletSigner for EvmWallet {
    fn address(&self) -> &str {
        &self.address
    }

    async fn sign_message(&self, message: &[u8]) -> CustodyResult<Signature> {
        self.sign_message_sync(message)
    }

    async fn sign_typed_data(&self, typed_data: &Eip712TypedData) -> CustodyResult<Signature> {
        self.sign_typed_data_sync(typed_data)
    }
}

impl std::fmt::Debug for EvmWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvmWallet")
            .field("address", &self.address)
            .finish()
    }
}

/// personal_sign 해시 계산
///
/// keccak256("\x19Ethereum Signed Message:\n{len}{message}")
pub fn personal_sign_hash(message: &[u8]) -> [u8; 32] {
    let mut prefixed = format!("\x19Ethereum Signed Message:\n{}", message.len()).into_bytes();
    prefixed.extend_from_slice(message);
    keccak256(&prefixed)
}
