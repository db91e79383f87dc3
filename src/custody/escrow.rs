//! Trading Key Escrow
//!
//! 거래 키(dtk)를 주 지갑 서명에서 파생한 키로 암호화해 서비스에 보관하고,
//! 같은 서명을 다시 만들어 복구합니다.
//!
//! ```text
//! signature = wallet.sign_typed_data(REGISTRATION)        (결정적)
//! material  = keccak256(utf8(signature.to_hex()))          (secp256k1 개인키)
//! dtk       = ECIES(material.public_key, {"data": "<hex>"})
//! ```
//!
//! 에스크로 키 쌍은 Stark 키 쌍과 무관합니다. 복구에는 지갑 서명만 있으면 됩니다.

use crate::crypto::common::{Signature, WalletSigner};
use crate::crypto::evm::{ecies, keccak256, EciesPayload, Eip712Domain, Eip712TypedData, TypedDataField};
use crate::errors::{CustodyError, CustodyResult};
use k256::{PublicKey, SecretKey};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use zeroize::Zeroizing;

/// 암호화된 거래 키 형식 버전
pub const DTK_VERSION: &str = "v3";

const REGISTRATION_DOMAIN_NAME: &str = "rhino.fi";
const REGISTRATION_DOMAIN_VERSION: &str = "1.0.0";
const REGISTRATION_ACTION: &str = "Access your rhino.fi account";
const REGISTRATION_ONLY_SIGN_ON: &str = "app.rhino.fi";

/// 거래 키 (32바이트 시드)
pub struct TradingKey(Zeroizing<[u8; 32]>);

impl TradingKey {
    /// 새 거래 키 생성
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        let mut bytes = Zeroizing::new([0u8; 32]);
        rng.fill_bytes(&mut bytes[..]);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// 64자 hex (0x 접두사 선택)
    pub fn from_hex(value: &str) -> CustodyResult<Self> {
        let value = value.trim();
        let digits = value.strip_prefix("0x").unwrap_or(value);
        if digits.len() != 64 {
            return Err(CustodyError::DecryptionFailed {
                message: format!("trading key must be 64 hex chars, got {}", digits.len()),
            });
        }

        let mut bytes = Zeroizing::new([0u8; 32]);
        hex::decode_to_slice(digits, &mut bytes[..]).map_err(|e| CustodyError::DecryptionFailed {
            message: format!("trading key is not hex: {e}"),
        })?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// 소문자 hex (0x 없음, 64자)
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(&self.0[..]))
    }
}

impl std::fmt::Debug for TradingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TradingKey(..)")
    }
}

/// 서비스에 저장되는 암호화된 거래 키
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedTradingKey {
    pub dtk: String,
    pub dtk_version: String,
}

impl EncryptedTradingKey {
    pub fn new(dtk: impl Into<String>) -> Self {
        Self {
            dtk: dtk.into(),
            dtk_version: DTK_VERSION.to_string(),
        }
    }
}

/// 에스크로 키 재료 (secp256k1 개인키 바이트)
pub struct EncryptionKeyMaterial(Zeroizing<[u8; 32]>);

impl EncryptionKeyMaterial {
    /// `keccak256(utf8("0x" + hex(r || s || v)))`
    pub fn from_signature(signature: &Signature) -> Self {
        Self(Zeroizing::new(keccak256(signature.to_hex().as_bytes())))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn secret_key(&self) -> CustodyResult<SecretKey> {
        SecretKey::from_slice(&self.0[..]).map_err(|e| CustodyError::InvalidPrivateKey {
            message: format!("escrow key material is not a valid secp256k1 scalar: {e}"),
        })
    }

    pub fn public_key(&self) -> CustodyResult<PublicKey> {
        Ok(self.secret_key()?.public_key())
    }
}

impl std::fmt::Debug for EncryptionKeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKeyMaterial(..)")
    }
}

/// 에스크로 키 파생에 서명하는 고정 EIP-712 메시지
pub fn registration_typed_data() -> Eip712TypedData {
    let mut types = HashMap::new();
    types.insert(
        REGISTRATION_DOMAIN_NAME.to_string(),
        vec![
            TypedDataField::new("action", "string"),
            TypedDataField::new("onlySignOn", "string"),
        ],
    );

    Eip712TypedData::new(
        Eip712Domain::new(REGISTRATION_DOMAIN_NAME, REGISTRATION_DOMAIN_VERSION),
        REGISTRATION_DOMAIN_NAME,
        types,
        serde_json::json!({
            "action": REGISTRATION_ACTION,
            "onlySignOn": REGISTRATION_ONLY_SIGN_ON,
        }),
    )
}

/// 지갑으로 고정 메시지에 서명해 에스크로 키 재료를 파생합니다.
pub async fn derive_encryption_key(wallet: &dyn WalletSigner) -> CustodyResult<EncryptionKeyMaterial> {
    let signature = wallet.sign_typed_data(&registration_typed_data()).await?;
    Ok(EncryptionKeyMaterial::from_signature(&signature))
}

#[derive(Deserialize)]
struct Envelope {
    data: String,
}

/// 거래 키 암호화/복호화
#[derive(Debug)]
pub struct TradingKeyCipher {
    material: EncryptionKeyMaterial,
}

impl TradingKeyCipher {
    pub fn new(material: EncryptionKeyMaterial) -> Self {
        Self { material }
    }

    pub async fn from_wallet(wallet: &dyn WalletSigner) -> CustodyResult<Self> {
        Ok(Self::new(derive_encryption_key(wallet).await?))
    }

    /// `{"data": "<dtk hex>"}`를 암호화
    pub fn encrypt_trading_key<R: RngCore + CryptoRng>(
        &self,
        trading_key: &TradingKey,
        rng: &mut R,
    ) -> CustodyResult<EncryptedTradingKey> {
        let envelope = Zeroizing::new(format!("{{\"data\": \"{}\"}}", trading_key.to_hex().as_str()));
        let payload = ecies::encrypt(&self.material.public_key()?, envelope.as_bytes(), rng)?;
        Ok(EncryptedTradingKey::new(payload.to_hex()))
    }

    /// 암호문을 복호화해 거래 키를 복원
    pub fn decrypt_trading_key(&self, encrypted: &EncryptedTradingKey) -> CustodyResult<TradingKey> {
        if encrypted.dtk_version != DTK_VERSION {
            return Err(CustodyError::DecryptionFailed {
                message: format!("unsupported dtk version: {}", encrypted.dtk_version),
            });
        }

        let payload = EciesPayload::from_hex(&encrypted.dtk)?;
        let plaintext = ecies::decrypt(&self.material.secret_key()?, &payload)?;

        let envelope: Envelope = serde_json::from_slice(&plaintext).map_err(|e| CustodyError::DecryptionFailed {
            message: format!("decrypted payload is not a trading key envelope: {e}"),
        })?;
        let data = Zeroizing::new(envelope.data);
        TradingKey::from_hex(&data)
    }
}
