//! Stark Key Derivation
//!
//! 거래 키 시드에서 Stark 키 쌍을 결정적으로 파생합니다.
//!
//! ```text
//! private = seed mod N
//! public  = x(private · G)
//! ```

use super::curve::{felt_to_biguint, multiply_base, reduce_scalar};
use super::pedersen::{felt_to_natural_hex, parse_felt_hex};
use crate::custody::TradingKey;
use crate::errors::{CustodyError, CustodyResult};
use num_bigint::BigUint;
use num_traits::Num;
use starknet_types_core::felt::Felt;

/// Stark 키 쌍
#[derive(Clone)]
pub struct StarkKeyPair {
    private_key: Felt,
    public_key: Felt,
}

impl StarkKeyPair {
    /// Hex 시드에서 파생 (0x 접두사 선택, 길이 제한 없음)
    pub fn from_seed_hex(seed_hex: &str) -> CustodyResult<Self> {
        let seed_hex = seed_hex.trim();
        let digits = seed_hex.strip_prefix("0x").unwrap_or(seed_hex);

        let seed = BigUint::from_str_radix(digits, 16).map_err(|e| CustodyError::InvalidPrivateKey {
            message: format!("Invalid seed hex: {e}"),
        })?;
        Self::from_seed(&seed)
    }

    /// 빅엔디언 바이트 시드에서 파생
    pub fn from_seed_bytes(seed: &[u8]) -> CustodyResult<Self> {
        Self::from_seed(&BigUint::from_bytes_be(seed))
    }

    /// 거래 키(dtk)에서 파생
    pub fn from_trading_key(trading_key: &TradingKey) -> CustodyResult<Self> {
        Self::from_seed_bytes(trading_key.as_bytes())
    }

    fn from_seed(seed: &BigUint) -> CustodyResult<Self> {
        let private_key = reduce_scalar(seed)?;
        Ok(Self {
            private_key,
            public_key: multiply_base(&private_key),
        })
    }

    pub fn private_key(&self) -> &Felt {
        &self.private_key
    }

    pub fn public_key(&self) -> &Felt {
        &self.public_key
    }

    /// 서비스에 등록되는 공개키 문자열
    ///
    /// `"0"` + 선행 0 없는 소문자 hex. 예) x = 0x1ef1... → `"01ef1..."`
    pub fn public_key_hex(&self) -> String {
        format!("0{}", felt_to_natural_hex(&self.public_key))
    }

    /// 저장된 공개키 문자열과 수치적으로 비교합니다 (선행 0, 접두사 무관).
    pub fn matches_public_key(&self, stored: &str) -> bool {
        parse_felt_hex(stored)
            .map(|stored| felt_to_biguint(&stored) == felt_to_biguint(&self.public_key))
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for StarkKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StarkKeyPair")
            .field("public_key", &self.public_key_hex())
            .finish()
    }
}
