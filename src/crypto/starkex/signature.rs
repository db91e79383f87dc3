//! Stark ECDSA Signature
//!
//! 다이제스트에 대한 Stark 곡선 ECDSA 서명/검증.
//!
//! 논스 k는 RFC 6979로 결정적으로 생성합니다. 라이브러리가 k를 거부하면
//! (r 또는 s가 범위를 벗어남) 시드를 올려가며 재시도하고, 한도를 넘기면
//! [`CustodyError::DegenerateNonce`]를 반환합니다.

use super::curve::{ec_order, felt_to_biguint};
use super::pedersen::felt_to_hex;
use crate::errors::{CustodyError, CustodyResult};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};
use starknet_crypto::SignError;
use starknet_types_core::felt::Felt;

/// 논스 재시도 한도
pub const MAX_NONCE_ATTEMPTS: u32 = 16;

/// 서명 가능한 다이제스트 상한 (2^251)
fn digest_upper_bound() -> BigUint {
    BigUint::one() << 251u32
}

/// Stark 서명 `(r, s)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StarkSignature {
    pub r: Felt,
    pub s: Felt,
}

/// 서비스로 전송되는 서명 형식
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureHex {
    pub r: String,
    pub s: String,
}

impl StarkSignature {
    /// `0 < r < 2^251`, `0 < s < N`
    pub fn is_canonical(&self) -> bool {
        let r = felt_to_biguint(&self.r);
        let s = felt_to_biguint(&self.s);
        !r.is_zero() && r < digest_upper_bound() && !s.is_zero() && s < ec_order()
    }

    pub fn to_hex(&self) -> SignatureHex {
        SignatureHex {
            r: felt_to_hex(&self.r),
            s: felt_to_hex(&self.s),
        }
    }
}

/// 결정적 서명
pub fn sign(private_key: &Felt, digest: &Felt) -> CustodyResult<StarkSignature> {
    sign_with_seed(private_key, digest, None)
}

/// RFC 6979 추가 시드를 지정한 서명
///
/// 거부된 k마다 시드를 1씩 올립니다.
pub fn sign_with_seed(
    private_key: &Felt,
    digest: &Felt,
    initial_seed: Option<&Felt>,
) -> CustodyResult<StarkSignature> {
    if felt_to_biguint(digest) >= digest_upper_bound() {
        return Err(CustodyError::InvalidSignature {
            message: format!("digest {} is not below 2^251", felt_to_hex(digest)),
        });
    }

    let mut seed = initial_seed.copied();
    for _ in 0..MAX_NONCE_ATTEMPTS {
        let k = starknet_crypto::rfc6979_generate_k(digest, private_key, seed.as_ref());

        match starknet_crypto::sign(private_key, digest, &k) {
            Ok(extended) => {
                let signature = StarkSignature {
                    r: extended.r,
                    s: extended.s,
                };
                if signature.is_canonical() {
                    return Ok(signature);
                }
            },
            Err(SignError::InvalidK) => {},
            Err(e) => {
                return Err(CustodyError::InvalidSignature {
                    message: format!("Stark signing failed: {e:?}"),
                })
            },
        }

        seed = Some(seed.map_or(Felt::ONE, |s| s + Felt::ONE));
    }

    Err(CustodyError::DegenerateNonce {
        attempts: MAX_NONCE_ATTEMPTS,
    })
}

/// 공개키(x 좌표)로 서명 검증
pub fn verify(public_key: &Felt, digest: &Felt, signature: &StarkSignature) -> CustodyResult<bool> {
    if !signature.is_canonical() {
        return Ok(false);
    }

    starknet_crypto::verify(public_key, digest, &signature.r, &signature.s).map_err(|e| {
        CustodyError::InvalidSignature {
            message: format!("Stark verification failed: {e:?}"),
        }
    })
}
