//! StarkEx cryptographic primitives
//!
//! # 모듈
//!
//! - `curve`: Stark 곡선 점 연산 및 스칼라 축소
//! - `pedersen`: Pedersen 커밋 해시
//! - `keys`: 거래 키 시드 → Stark 키 쌍 파생
//! - `transfer`: 전송 주문 필드 패킹 및 다이제스트
//! - `signature`: Stark ECDSA 서명/검증

pub mod curve;
mod keys;
mod pedersen;
mod signature;
mod transfer;

pub use curve::{ec_order, multiply_base, reduce_scalar, StarkPoint};
pub use keys::StarkKeyPair;
pub use pedersen::{felt_to_hex, felt_to_natural_hex, parse_felt_hex, pedersen_hash, transfer_digest};
pub use signature::{sign, sign_with_seed, verify, SignatureHex, StarkSignature, MAX_NONCE_ATTEMPTS};
pub use transfer::{
    dequantize_amount, expiration_timestamp, quantize_amount, transfer_amount, TransferOrder, VaultReference,
    DEFAULT_EXPIRATION_WINDOW_HOURS, QUANTIZATION_FACTOR,
};
