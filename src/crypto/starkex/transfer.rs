//! Transfer Message Packing
//!
//! StarkEx 전송 주문의 고정 폭 필드를 하나의 정수로 패킹하고 서명 다이제스트를 계산합니다.
//!
//! # 레이아웃 (상위 → 하위 비트)
//!
//! | 필드 | 비트 |
//! |------|------|
//! | instruction type (= 1) | - |
//! | sender vault id | 31 |
//! | receiver vault id | 31 |
//! | amount | 63 |
//! | reserved (= 0) | 63 |
//! | nonce | 31 |
//! | expiration timestamp (hours) | 22 |
//!
//! 폭을 넘는 값은 잘라내지 않고 [`CustodyError::FieldOverflow`]로 거부합니다.

use super::curve::biguint_to_felt;
use super::pedersen::{parse_felt_hex, transfer_digest};
use crate::errors::{CustodyError, CustodyResult};
use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use starknet_types_core::felt::Felt;

/// 전송 주문 instruction type
pub const TRANSFER_INSTRUCTION_TYPE: u64 = 1;

/// 기본 만료 기간 (시간, 180일)
pub const DEFAULT_EXPIRATION_WINDOW_HOURS: u64 = 4320;

/// 수량 양자화 단위 (10^8)
pub const QUANTIZATION_FACTOR: u64 = 100_000_000;

pub const VAULT_ID_BITS: u32 = 31;
pub const AMOUNT_BITS: u32 = 63;
pub const NONCE_BITS: u32 = 31;
pub const EXPIRATION_BITS: u32 = 22;

/// 볼트 식별자와 소유자 Stark 공개키
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultReference {
    pub vault_id: u64,
    pub public_key: String,
}

impl VaultReference {
    pub fn new(vault_id: u64, public_key: impl Into<String>) -> Self {
        Self {
            vault_id,
            public_key: public_key.into(),
        }
    }
}

/// 서명 전 전송 주문 (생성 후 불변)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOrder {
    sender_vault_id: u64,
    receiver_vault_id: u64,
    amount: u64,
    nonce: u64,
    expiration_timestamp: u64,
    token_id: Felt,
    receiver_public_key: Felt,
}

impl TransferOrder {
    /// 모든 필드 폭과 hex 값을 검증해 주문을 생성합니다.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sender_vault_id: u64,
        receiver_vault_id: u64,
        amount: u64,
        nonce: u64,
        expiration_timestamp: u64,
        token_id: &str,
        receiver_public_key: &str,
    ) -> CustodyResult<Self> {
        let order = Self {
            sender_vault_id,
            receiver_vault_id,
            amount,
            nonce,
            expiration_timestamp,
            token_id: parse_felt_hex(token_id)?,
            receiver_public_key: parse_felt_hex(receiver_public_key)?,
        };
        order.packed_fields()?;
        Ok(order)
    }

    /// 송신/수신 볼트 참조로 생성
    pub fn between(
        sender: &VaultReference,
        receiver: &VaultReference,
        amount: u64,
        nonce: u64,
        expiration_timestamp: u64,
        token_id: &str,
    ) -> CustodyResult<Self> {
        Self::new(
            sender.vault_id,
            receiver.vault_id,
            amount,
            nonce,
            expiration_timestamp,
            token_id,
            &receiver.public_key,
        )
    }

    pub fn sender_vault_id(&self) -> u64 {
        self.sender_vault_id
    }

    pub fn receiver_vault_id(&self) -> u64 {
        self.receiver_vault_id
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn expiration_timestamp(&self) -> u64 {
        self.expiration_timestamp
    }

    pub fn token_id(&self) -> &Felt {
        &self.token_id
    }

    pub fn receiver_public_key(&self) -> &Felt {
        &self.receiver_public_key
    }

    /// 고정 폭 필드 패킹
    pub fn packed_fields(&self) -> CustodyResult<BigUint> {
        let packed = BigUint::from(TRANSFER_INSTRUCTION_TYPE);
        let packed = push_field(packed, "senderVaultId", self.sender_vault_id, VAULT_ID_BITS)?;
        let packed = push_field(packed, "receiverVaultId", self.receiver_vault_id, VAULT_ID_BITS)?;
        let packed = push_field(packed, "amount", self.amount, AMOUNT_BITS)?;
        let packed = push_field(packed, "reserved", 0, AMOUNT_BITS)?;
        let packed = push_field(packed, "nonce", self.nonce, NONCE_BITS)?;
        push_field(packed, "expirationTimestamp", self.expiration_timestamp, EXPIRATION_BITS)
    }

    /// `H(H(token, receiver), packed)`
    pub fn digest(&self) -> CustodyResult<Felt> {
        let packed = biguint_to_felt(&self.packed_fields()?)?;
        Ok(transfer_digest(&self.token_id, &self.receiver_public_key, &packed))
    }
}

fn push_field(acc: BigUint, field: &'static str, value: u64, bits: u32) -> CustodyResult<BigUint> {
    if bits < 64 && value >> bits != 0 {
        return Err(CustodyError::FieldOverflow {
            field,
            value: value.to_string(),
            bits,
        });
    }
    Ok((acc << bits) + value)
}

/// 사람 단위 수량을 10^8 단위 정수로 양자화합니다 (소수점 이하 버림).
///
/// 1.5 → 150000000
pub fn quantize_amount(amount: Decimal) -> CustodyResult<u64> {
    if amount.is_sign_negative() {
        return Err(CustodyError::InvalidAmount {
            message: format!("amount must not be negative: {amount}"),
        });
    }

    amount
        .checked_mul(Decimal::from(QUANTIZATION_FACTOR))
        .map(|scaled| scaled.trunc())
        .and_then(|scaled| scaled.to_u64())
        .ok_or_else(|| CustodyError::InvalidAmount {
            message: format!("amount {amount} cannot be quantized"),
        })
}

/// 전송 가능한 양자화 수량
///
/// 0으로 버려지는 수량은 [`CustodyError::InvalidAmount`], 63비트를 넘으면
/// [`CustodyError::FieldOverflow`]. 온체인 입금 전에 호출해야 합니다.
pub fn transfer_amount(amount: Decimal) -> CustodyResult<u64> {
    let quantized = quantize_amount(amount)?;
    if quantized == 0 {
        return Err(CustodyError::InvalidAmount {
            message: format!("amount {amount} is below the 10^-8 transfer unit"),
        });
    }
    if quantized >> AMOUNT_BITS != 0 {
        return Err(CustodyError::FieldOverflow {
            field: "amount",
            value: quantized.to_string(),
            bits: AMOUNT_BITS,
        });
    }
    Ok(quantized)
}

/// 양자화 수량 → 사람 단위 수량 (150000000 → 1.5)
pub fn dequantize_amount(quantized: u64) -> Decimal {
    Decimal::from(quantized) / Decimal::from(QUANTIZATION_FACTOR)
}

/// 만료 시각: 현재 시각(시간 단위) + 기간
pub fn expiration_timestamp(now: DateTime<Utc>, window_hours: u64) -> u64 {
    let hours = now.timestamp().max(0) as u64 / 3600;
    hours + window_hours
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    const TOKEN: &str = "0xb333e3142fe16b78628f19bb15afddaef437e72d6d7f5c6c20c6801a27fba6";
    const RECEIVER: &str = "0x1ef15c18599971b7beced415a40f0c7deacfd9b0d1819e03d723d8bc943cfca";

    fn order(amount: u64) -> CustodyResult<TransferOrder> {
        TransferOrder::new(12, 34, amount, 5, 100, TOKEN, RECEIVER)
    }

    #[test]
    fn test_packed_layout() {
        let packed = order(150_000_000).unwrap().packed_fields().unwrap();

        let mut expected = BigUint::from(1u8);
        for (value, bits) in [(12u64, 31u32), (34, 31), (150_000_000, 63), (0, 63), (5, 31), (100, 22)] {
            expected = (expected << bits) + value;
        }
        assert_eq!(packed, expected);
        // 1 + 31 + 31 + 63 + 63 + 31 + 22
        assert_eq!(packed.bits(), 242);
    }

    #[test]
    fn test_maximum_values_fit() {
        let max31 = (1u64 << 31) - 1;
        let max63 = (1u64 << 63) - 1;
        let max22 = (1u64 << 22) - 1;

        let order = TransferOrder::new(max31, max31, max63, max31, max22, TOKEN, RECEIVER).unwrap();
        assert!(order.digest().is_ok());
    }

    #[test]
    fn test_amount_overflow() {
        let err = order(1u64 << 63).unwrap_err();
        match err {
            CustodyError::FieldOverflow { field, bits, .. } => {
                assert_eq!(field, "amount");
                assert_eq!(bits, 63);
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_narrow_field_overflows() {
        assert!(TransferOrder::new(1 << 31, 0, 1, 1, 1, TOKEN, RECEIVER).is_err());
        assert!(TransferOrder::new(0, 1 << 31, 1, 1, 1, TOKEN, RECEIVER).is_err());
        assert!(TransferOrder::new(0, 0, 1, 1 << 31, 1, TOKEN, RECEIVER).is_err());
        assert!(TransferOrder::new(0, 0, 1, 1, 1 << 22, TOKEN, RECEIVER).is_err());
    }

    #[test]
    fn test_between_vaults() {
        let sender = VaultReference::new(12, "0x123");
        let receiver = VaultReference::new(34, RECEIVER);

        let order = TransferOrder::between(&sender, &receiver, 150_000_000, 5, 100, TOKEN).unwrap();
        assert_eq!(order, self::order(150_000_000).unwrap());
    }

    #[test]
    fn test_invalid_hex_rejected() {
        assert!(TransferOrder::new(1, 2, 3, 4, 5, "0xnothex", RECEIVER).is_err());
        assert!(TransferOrder::new(1, 2, 3, 4, 5, TOKEN, "").is_err());
    }

    #[test]
    fn test_digest_depends_on_every_field() {
        let base = order(1000).unwrap().digest().unwrap();
        let other_amount = order(1001).unwrap().digest().unwrap();
        let other_nonce = TransferOrder::new(12, 34, 1000, 6, 100, TOKEN, RECEIVER)
            .unwrap()
            .digest()
            .unwrap();

        assert_ne!(base, other_amount);
        assert_ne!(base, other_nonce);
        assert_eq!(base, order(1000).unwrap().digest().unwrap());
    }

    #[test]
    fn test_quantize_amount() {
        assert_eq!(quantize_amount(dec!(1.5)).unwrap(), 150_000_000);
        assert_eq!(quantize_amount(dec!(0.000000019)).unwrap(), 1);
        assert_eq!(quantize_amount(dec!(0)).unwrap(), 0);
        assert!(quantize_amount(dec!(-1)).is_err());
        assert!(quantize_amount(dec!(1000000000000000)).is_err());
    }

    #[test]
    fn test_transfer_amount_rejects_dust_and_overflow() {
        assert_eq!(transfer_amount(dec!(1.500000009)).unwrap(), 150_000_000);

        let err = transfer_amount(dec!(0.000000009)).unwrap_err();
        assert_eq!(err.code(), "INVALID_AMOUNT");
        assert!(transfer_amount(dec!(0)).is_err());

        let err = transfer_amount(dec!(100000000000)).unwrap_err();
        assert!(matches!(err, CustodyError::FieldOverflow { field: "amount", bits: 63, .. }));
    }

    #[test]
    fn test_dequantize_drops_nothing() {
        assert_eq!(dequantize_amount(150_000_000), dec!(1.5));
        assert_eq!(dequantize_amount(1), dec!(0.00000001));

        let quantized = transfer_amount(dec!(1.500000009)).unwrap();
        assert_eq!(dequantize_amount(quantized), dec!(1.5));
    }

    #[test]
    fn test_expiration_timestamp() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 59, 59).unwrap();
        let hours = now.timestamp() as u64 / 3600;

        assert_eq!(expiration_timestamp(now, DEFAULT_EXPIRATION_WINDOW_HOURS), hours + 4320);
        assert!(expiration_timestamp(now, DEFAULT_EXPIRATION_WINDOW_HOURS) < 1 << EXPIRATION_BITS);
    }
}
