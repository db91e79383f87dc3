//! Keccak256 hashing utilities
//!
//! EIP-712 인코딩, 주소 파생, 에스크로 키 파생에 쓰이는 Keccak256 헬퍼.

use sha3::{Digest, Keccak256};

/// 데이터의 Keccak256 해시를 계산합니다.
///
/// # Example
///
/// ```rust
/// use starkex_custody::crypto::evm::keccak256;
///
/// let hash = keccak256(b"hello");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// 정수를 32바이트 big-endian 형식으로 패딩
pub fn pad_u256(value: u64) -> [u8; 32] {
    let mut result = [0u8; 32];
    result[24..].copy_from_slice(&value.to_be_bytes());
    result
}

/// 주소를 32바이트로 패딩 (왼쪽 12바이트 0으로 채움)
pub fn pad_address(address: &[u8; 20]) -> [u8; 32] {
    let mut result = [0u8; 32];
    result[12..].copy_from_slice(address);
    result
}

/// Bool을 32바이트로 패딩
pub fn pad_bool(value: bool) -> [u8; 32] {
    let mut result = [0u8; 32];
    result[31] = value as u8;
    result
}
