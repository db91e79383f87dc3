//! Pedersen Commitment Hash
//!
//! 두 필드 원소를 하나로 압축하는 StarkEx 커밋 해시와 hex 변환 유틸리티.

use super::curve::{biguint_to_felt, felt_to_biguint};
use crate::errors::{CustodyError, CustodyResult};
use num_bigint::BigUint;
use num_traits::Num;
use starknet_types_core::felt::Felt;

/// Pedersen 해시 `H(a, b)`
///
/// 결정적이며 교환법칙이 성립하지 않습니다: 일반적으로 `H(a, b) != H(b, a)`.
pub fn pedersen_hash(a: &Felt, b: &Felt) -> Felt {
    starknet_crypto::pedersen_hash(a, b)
}

/// 전송 서명 다이제스트
///
/// `H(H(token_id, receiver_public_key), packed_fields)`
pub fn transfer_digest(token_id: &Felt, receiver_public_key: &Felt, packed_fields: &Felt) -> Felt {
    pedersen_hash(&pedersen_hash(token_id, receiver_public_key), packed_fields)
}

/// Hex 문자열을 필드 원소로 파싱 (0x 접두사 선택, 선행 0 허용)
///
/// 필드 소수 이상의 값은 축소하지 않고 에러를 반환합니다.
pub fn parse_felt_hex(value: &str) -> CustodyResult<Felt> {
    let trimmed = value.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    if digits.is_empty() {
        return Err(parse_error(value, "empty hex string"));
    }

    let number = BigUint::from_str_radix(digits, 16).map_err(|e| parse_error(value, &e.to_string()))?;
    biguint_to_felt(&number).map_err(|_| parse_error(value, "exceeds the field prime"))
}

/// 선행 0 없는 소문자 hex (접두사 없음, 0은 "0")
pub fn felt_to_natural_hex(value: &Felt) -> String {
    format!("{:x}", felt_to_biguint(value))
}

/// `0x` 접두사 + 선행 0 없는 소문자 hex
pub fn felt_to_hex(value: &Felt) -> String {
    format!("0x{}", felt_to_natural_hex(value))
}

fn parse_error(value: &str, message: &str) -> CustodyError {
    CustodyError::ParseError {
        data_type: "felt".into(),
        message: format!("{value}: {message}"),
    }
}
