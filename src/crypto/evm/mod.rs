//! EVM-compatible cryptographic utilities
//!
//! # 모듈
//!
//! - `keccak`: Keccak256 해싱
//! - `secp256k1`: ECDSA 서명 및 주소
//! - `eip712`: EIP-712 타입 데이터 인코딩
//! - `ecies`: 공개키 암호화 (거래 키 에스크로용)
//! - `wallet`: 로컬 키 기반 지갑 서명자

pub mod ecies;
mod eip712;
mod keccak;
mod secp256k1;
mod wallet;

pub use ecies::EciesPayload;
pub use eip712::{Eip712Domain, Eip712TypedData, TypedDataField};
pub use keccak::keccak256;
pub use secp256k1::{
    parse_private_key, private_key_to_address, recover_address, sign_hash, to_checksum_address,
};
pub use wallet::{personal_sign_hash, EvmWallet};
