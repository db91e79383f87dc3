//! secp256k1 ECDSA signing utilities
//!
//! Ethereum ECDSA 서명 및 주소 파생을 위한 유틸리티를 제공합니다.

use super::keccak::keccak256;
use crate::crypto::common::Signature;
use crate::errors::{CustodyError, CustodyResult};

use k256::{
    ecdsa::{RecoveryId, Signature as K256Signature, SigningKey, VerifyingKey},
    SecretKey,
};

/// 개인키에서 서명 키 생성
pub fn signing_key_from_bytes(private_key: &[u8]) -> CustodyResult<SigningKey> {
    let secret_key = SecretKey::from_slice(private_key).map_err(|e| CustodyError::InvalidPrivateKey {
        message: format!("Invalid secp256k1 key: {e}"),
    })?;
    Ok(SigningKey::from(secret_key))
}

/// 32바이트 해시에 서명합니다 (RFC 6979, 결정적).
///
/// # Returns
///
/// ECDSA 서명 (r, s, v), v = recovery_id + 27
pub fn sign_hash(signing_key: &SigningKey, hash: &[u8; 32]) -> CustodyResult<Signature> {
    let (sig, recovery_id) =
        signing_key
            .sign_prehash_recoverable(hash)
            .map_err(|e| CustodyError::InvalidSignature {
                message: format!("Signing failed: {e}"),
            })?;

    let sig_bytes = sig.to_bytes();
    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&sig_bytes[..32]);
    s.copy_from_slice(&sig_bytes[32..]);

    Ok(Signature::new(r, s, recovery_id.to_byte() + 27))
}

/// 서명에서 서명자 주소를 복구합니다.
pub fn recover_address(hash: &[u8; 32], signature: &Signature) -> CustodyResult<String> {
    let recovery_id = match signature.v {
        27 => RecoveryId::new(false, false),
        28 => RecoveryId::new(true, false),
        v => {
            return Err(CustodyError::InvalidSignature {
                message: format!("Invalid v value: {v}"),
            })
        },
    };

    let mut sig_bytes = [0u8; 64];
    sig_bytes[..32].copy_from_slice(&signature.r);
    sig_bytes[32..].copy_from_slice(&signature.s);

    let sig = K256Signature::from_slice(&sig_bytes).map_err(|e| CustodyError::InvalidSignature {
        message: format!("Invalid signature: {e}"),
    })?;

    let verifying_key = VerifyingKey::recover_from_prehash(hash, &sig, recovery_id).map_err(|e| {
        CustodyError::InvalidSignature {
            message: format!("Recovery failed: {e}"),
        }
    })?;

    Ok(verifying_key_to_address(&verifying_key))
}

/// 공개키에서 Ethereum 주소 계산 (소문자)
pub fn verifying_key_to_address(key: &VerifyingKey) -> String {
    let public_key = key.to_encoded_point(false);

    // 첫 바이트(0x04)를 제외한 64바이트의 Keccak256 해시, 마지막 20바이트
    let hash = keccak256(&public_key.as_bytes()[1..]);
    format!("0x{}", hex::encode(&hash[12..]))
}

/// 개인키에서 체크섬 형식의 Ethereum 주소 계산
pub fn private_key_to_address(private_key: &[u8]) -> CustodyResult<String> {
    let signing_key = signing_key_from_bytes(private_key)?;
    let address = verifying_key_to_address(signing_key.verifying_key());
    Ok(to_checksum_address(&address))
}

/// EIP-55 체크섬 주소로 변환
pub fn to_checksum_address(address: &str) -> String {
    let address_lower = address.to_lowercase();
    let address_hex = address_lower.strip_prefix("0x").unwrap_or(&address_lower);
    let hash_hex = hex::encode(keccak256(address_hex.as_bytes()));

    let checksummed: String = address_hex
        .chars()
        .zip(hash_hex.chars())
        .map(|(c, h)| {
            if c.is_ascii_alphabetic() && h.to_digit(16).unwrap_or(0) >= 8 {
                c.to_ascii_uppercase()
            } else {
                c
            }
        })
        .collect();

    format!("0x{checksummed}")
}

/// Hex 문자열에서 개인키 파싱
pub fn parse_private_key(hex_str: &str) -> CustodyResult<[u8; 32]> {
    let hex_str = hex_str.trim();
    let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);

    let bytes = hex::decode(hex_str).map_err(|e| CustodyError::InvalidPrivateKey {
        message: format!("Invalid hex: {e}"),
    })?;

    bytes.as_slice().try_into().map_err(|_| CustodyError::InvalidPrivateKey {
        message: format!("Private key must be 32 bytes, got {}", bytes.len()),
    })
}
