//! Common cryptographic traits for wallet signing
//!
//! 주 지갑(primary wallet) 서명 기능을 추상화합니다. 워크플로우는 구체적인
//! 지갑 타입 대신 [`WalletSigner`]만 의존하므로 테스트에서 고정 서명으로 대체할 수 있습니다.

use crate::crypto::evm::Eip712TypedData;
use crate::errors::{CustodyError, CustodyResult};
use async_trait::async_trait;

/// ECDSA 서명 결과 (secp256k1)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// r 값 (32 bytes)
    pub r: [u8; 32],
    /// s 값 (32 bytes)
    pub s: [u8; 32],
    /// v 값 (recovery id, 27 또는 28)
    pub v: u8,
}

impl Signature {
    /// 새 서명 생성
    pub fn new(r: [u8; 32], s: [u8; 32], v: u8) -> Self {
        Self { r, s, v }
    }

    /// 65바이트 형식으로 변환 (r || s || v)
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut bytes = [0u8; 65];
        bytes[..32].copy_from_slice(&self.r);
        bytes[32..64].copy_from_slice(&self.s);
        bytes[64] = self.v;
        bytes
    }

    /// 65바이트에서 파싱
    pub fn from_bytes(bytes: &[u8; 65]) -> Self {
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..64]);
        Self { r, s, v: bytes[64] }
    }

    /// 소문자 hex 문자열 (0x 접두사 포함, 132자)
    ///
    /// 암호화 키 파생과 인증 헤더 모두 이 형식을 그대로 사용합니다.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }

    /// Hex 문자열에서 파싱 (0x 접두사 선택)
    pub fn from_hex(hex_str: &str) -> CustodyResult<Self> {
        let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        let bytes = hex::decode(hex_str).map_err(|e| CustodyError::InvalidSignature {
            message: format!("Invalid hex: {e}"),
        })?;

        let arr: [u8; 65] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CustodyError::InvalidSignature {
                message: format!("Expected 65 bytes, got {}", bytes.len()),
            })?;

        Ok(Self::from_bytes(&arr))
    }
}

/// 주 지갑 서명자 - 워크플로우에 주입되는 지갑 기능
///
/// 같은 지갑과 같은 메시지에 대해 항상 같은 서명을 반환해야 합니다
/// (RFC 6979). 에스크로 암호화 키가 이 서명에서 재파생되기 때문입니다.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// 지갑 주소 반환 (체크섬 형식)
    fn address(&self) -> &str;

    /// personal_sign 스타일 메시지 서명
    ///
    /// 메시지에 "\x19Ethereum Signed Message:\n{len}" 접두사를 추가하고 서명
    async fn sign_message(&self, message: &[u8]) -> CustodyResult<Signature>;

    /// EIP-712 타입 데이터 서명
    async fn sign_typed_data(&self, typed_data: &Eip712TypedData) -> CustodyResult<Signature>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_hex_format() {
        let sig = Signature::new([0xab; 32], [0xcd; 32], 28);
        let hex_str = sig.to_hex();

        assert!(hex_str.starts_with("0x"));
        assert_eq!(hex_str.len(), 2 + 130);
        assert!(hex_str.ends_with("1c"));
        assert_eq!(Signature::from_hex(&hex_str).unwrap(), sig);
    }

    #[test]
    fn test_signature_from_hex_rejects_wrong_length() {
        let err = Signature::from_hex("0xdeadbeef").unwrap_err();
        assert_eq!(err.code(), "INVALID_SIGNATURE");
    }
}
