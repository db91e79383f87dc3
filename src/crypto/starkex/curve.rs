//! Stark Curve Arithmetic
//!
//! StarkEx가 사용하는 STARK 친화 곡선 `y² = x³ + α·x + β` 위의 연산.
//!
//! - 필드 원소: [`Felt`] (소수 P = 2^251 + 17·2^192 + 1)
//! - 스칼라: 곡선 위수 N으로 축소된 정수
//!
//! # 참조
//!
//! - [StarkEx Stark Curve](https://docs.starkware.co/starkex/crypto/stark-curve.html)

use crate::errors::{CustodyError, CustodyResult};
use num_bigint::BigUint;
use num_traits::Zero;
use starknet_types_core::felt::Felt;

// 상수는 모두 N < P 범위의 필드 원소이며 `Felt::from_hex_unchecked`로 읽습니다.
// 잘못된 값은 0으로 대체되지 않고 즉시 패닉합니다 (tests 참고).

/// 곡선 위수 N
pub const EC_ORDER_HEX: &str = "0x0800000000000010ffffffffffffffffb781126dcae7b2321e66a241adc64d2f";

/// 곡선 계수 β (α = 1)
pub const BETA_HEX: &str = "0x06f21413efbe40de150e596d72f7a8c5609ad26c15c915c1f4cdfcb99cee9e89";

/// 생성점 G
pub const GENERATOR_X_HEX: &str = "0x01ef15c18599971b7beced415a40f0c7deacfd9b0d1819e03d723d8bc943cfca";
pub const GENERATOR_Y_HEX: &str = "0x005668060aa49730b7be4801df46ec62de53ecd11abe43a32873000c36e8dc1f";

/// 곡선 위수 N
pub fn ec_order() -> BigUint {
    felt_to_biguint(&Felt::from_hex_unchecked(EC_ORDER_HEX))
}

/// 필드 소수 P (= `Felt::MAX + 1`)
pub fn field_prime() -> BigUint {
    felt_to_biguint(&Felt::MAX) + 1u8
}

fn beta() -> Felt {
    Felt::from_hex_unchecked(BETA_HEX)
}

/// 임의 크기 정수를 곡선 위수로 축소해 개인 스칼라로 만듭니다.
///
/// 축소 결과가 0이면 유효한 개인키가 아니므로 에러입니다.
pub fn reduce_scalar(value: &BigUint) -> CustodyResult<Felt> {
    let reduced = value % ec_order();
    if reduced.is_zero() {
        return Err(CustodyError::InvalidPrivateKey {
            message: "seed reduces to zero modulo the curve order".into(),
        });
    }
    biguint_to_felt(&reduced)
}

/// 생성점의 스칼라 곱 `k·G`의 x 좌표 (= Stark 공개키)
pub fn multiply_base(scalar: &Felt) -> Felt {
    starknet_crypto::get_public_key(scalar)
}

/// 곡선 위의 점 (아핀 좌표 또는 무한원점)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StarkPoint {
    Infinity,
    Affine { x: Felt, y: Felt },
}

impl StarkPoint {
    pub fn generator() -> Self {
        StarkPoint::Affine {
            x: Felt::from_hex_unchecked(GENERATOR_X_HEX),
            y: Felt::from_hex_unchecked(GENERATOR_Y_HEX),
        }
    }

    pub fn x(&self) -> Option<Felt> {
        match self {
            StarkPoint::Infinity => None,
            StarkPoint::Affine { x, .. } => Some(*x),
        }
    }

    pub fn is_on_curve(&self) -> bool {
        match *self {
            StarkPoint::Infinity => true,
            StarkPoint::Affine { x, y } => y * y == x * x * x + x + beta(),
        }
    }

    pub fn add(&self, other: &StarkPoint) -> StarkPoint {
        let (x1, y1, x2, y2) = match (*self, *other) {
            (StarkPoint::Infinity, p) | (p, StarkPoint::Infinity) => return p,
            (StarkPoint::Affine { x: x1, y: y1 }, StarkPoint::Affine { x: x2, y: y2 }) => (x1, y1, x2, y2),
        };

        if x1 == x2 {
            return if y1 + y2 == Felt::ZERO {
                StarkPoint::Infinity
            } else {
                self.double()
            };
        }

        let Some(inv) = (x2 - x1).inverse() else {
            return StarkPoint::Infinity;
        };
        let slope = (y2 - y1) * inv;
        let x3 = slope * slope - x1 - x2;
        let y3 = slope * (x1 - x3) - y1;
        StarkPoint::Affine { x: x3, y: y3 }
    }

    pub fn double(&self) -> StarkPoint {
        let StarkPoint::Affine { x, y } = *self else {
            return StarkPoint::Infinity;
        };
        let Some(inv) = (Felt::TWO * y).inverse() else {
            return StarkPoint::Infinity;
        };

        // α = 1
        let slope = (Felt::THREE * x * x + Felt::ONE) * inv;
        let x3 = slope * slope - Felt::TWO * x;
        let y3 = slope * (x - x3) - y;
        StarkPoint::Affine { x: x3, y: y3 }
    }

    /// double-and-add 스칼라 곱
    pub fn multiply(&self, scalar: &BigUint) -> StarkPoint {
        let mut result = StarkPoint::Infinity;
        for i in (0..scalar.bits()).rev() {
            result = result.double();
            if scalar.bit(i) {
                result = result.add(self);
            }
        }
        result
    }
}

pub fn felt_to_biguint(value: &Felt) -> BigUint {
    BigUint::from_bytes_be(&value.to_bytes_be())
}

/// 필드 소수 이상인 값은 조용히 축소하지 않고 거부합니다.
pub fn biguint_to_felt(value: &BigUint) -> CustodyResult<Felt> {
    if value >= &field_prime() {
        return Err(CustodyError::InvalidSignature {
            message: format!("value 0x{value:x} is not a field element"),
        });
    }

    let bytes = value.to_bytes_be();
    let mut padded = [0u8; 32];
    padded[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(Felt::from_bytes_be(&padded))
}
