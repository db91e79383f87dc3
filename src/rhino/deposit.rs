//! On-chain deposit into the bridge contract
//!
//! 이 크레이트는 트랜잭션 파라미터만 만들고, 서명/전송/확인은 주입된
//! [`DepositSubmitter`]가 담당합니다.

use super::types::BridgeChainConfig;
use crate::crypto::evm::to_checksum_address;
use crate::errors::{CustodyError, CustodyResult};
use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// 브리지 컨트랙트 입금 함수 셀렉터 (추가 calldata 없음)
pub const DEPOSIT_SELECTOR: &str = "0xdb6b5246";

const WEI_PER_ETH: u64 = 1_000_000_000_000_000_000;

/// 입금 트랜잭션 파라미터
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositRequest {
    pub chain: String,
    /// 체크섬 형식의 브리지 컨트랙트 주소
    pub to: String,
    pub value_wei: u128,
    pub data: String,
}

impl DepositRequest {
    pub fn new(chain: impl Into<String>, bridge: &BridgeChainConfig, amount: Decimal) -> CustodyResult<Self> {
        let chain = chain.into();
        if !bridge.enabled {
            return Err(CustodyError::ExchangeError {
                message: format!("bridge deposits are disabled on {chain}"),
            });
        }

        Ok(Self {
            chain,
            to: to_checksum_address(&bridge.contract_address),
            value_wei: to_wei(amount)?,
            data: DEPOSIT_SELECTOR.to_string(),
        })
    }
}

/// `trunc(amount · 10^18)`
pub fn to_wei(amount: Decimal) -> CustodyResult<u128> {
    if amount.is_sign_negative() {
        return Err(CustodyError::InvalidAmount {
            message: format!("deposit amount must not be negative: {amount}"),
        });
    }

    amount
        .checked_mul(Decimal::from(WEI_PER_ETH))
        .and_then(|wei| wei.trunc().to_u128())
        .ok_or_else(|| CustodyError::InvalidAmount {
            message: format!("deposit amount {amount} cannot be expressed in wei"),
        })
}

/// 입금 트랜잭션 전송자
#[async_trait]
pub trait DepositSubmitter: Send + Sync {
    /// 트랜잭션을 전송하고 확인될 때까지 기다린 뒤 트랜잭션 해시를 반환
    async fn submit_deposit(&self, request: &DepositRequest) -> CustodyResult<String>;
}
