//! ECIES over secp256k1 (eth-crypto / eccrypto compatible)
//!
//! 공개키 암호화로 임의의 바이트 블롭을 봉인합니다.
//!
//! # 구성
//!
//! ```text
//! shared   = x(ephemeral_secret * recipient_public)        (32 bytes)
//! h        = SHA-512(shared)
//! enc_key  = h[0..32], mac_key = h[32..64]
//! ct       = AES-256-CBC-PKCS7(enc_key, iv, plaintext)
//! mac      = HMAC-SHA256(mac_key, iv || ephemeral_pub_uncompressed || ct)
//! wire     = hex(iv(16) || ephemeral_pub_compressed(33) || mac(32) || ct)
//! ```
//!
//! MAC은 복호화 전에 상수 시간으로 검증합니다. 잘못된 키나 변조된 입력은
//! 언제나 [`CustodyError::DecryptionFailed`]가 되며 평문을 만들어내지 않습니다.

use crate::errors::{CustodyError, CustodyResult};
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::{ecdh::diffie_hellman, PublicKey, SecretKey};
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256, Sha512};
use zeroize::Zeroizing;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type HmacSha256 = Hmac<Sha256>;

const IV_LEN: usize = 16;
const COMPRESSED_KEY_LEN: usize = 33;
const MAC_LEN: usize = 32;
const BLOCK_LEN: usize = 16;

/// ECIES 암호문
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EciesPayload {
    pub iv: [u8; IV_LEN],
    pub ephemeral_public_key: PublicKey,
    pub mac: [u8; MAC_LEN],
    pub ciphertext: Vec<u8>,
}

impl EciesPayload {
    /// eth-crypto `cipher.stringify` 형식의 hex 문자열 (0x 없음)
    pub fn to_hex(&self) -> String {
        let compressed = self.ephemeral_public_key.to_encoded_point(true);

        let mut bytes = Vec::with_capacity(IV_LEN + COMPRESSED_KEY_LEN + MAC_LEN + self.ciphertext.len());
        bytes.extend_from_slice(&self.iv);
        bytes.extend_from_slice(compressed.as_bytes());
        bytes.extend_from_slice(&self.mac);
        bytes.extend_from_slice(&self.ciphertext);
        hex::encode(bytes)
    }

    /// `to_hex` 형식 파싱
    pub fn from_hex(encoded: &str) -> CustodyResult<Self> {
        let encoded = encoded.trim();
        let encoded = encoded.strip_prefix("0x").unwrap_or(encoded);
        let bytes = hex::decode(encoded).map_err(|e| decryption_error(format!("ciphertext is not hex: {e}")))?;

        let header = IV_LEN + COMPRESSED_KEY_LEN + MAC_LEN;
        if bytes.len() < header + BLOCK_LEN {
            return Err(decryption_error(format!(
                "ciphertext too short: {} bytes",
                bytes.len()
            )));
        }

        let (iv, rest) = bytes.split_at(IV_LEN);
        let (key, rest) = rest.split_at(COMPRESSED_KEY_LEN);
        let (mac, ciphertext) = rest.split_at(MAC_LEN);

        if ciphertext.len() % BLOCK_LEN != 0 {
            return Err(decryption_error(format!(
                "ciphertext length {} is not a multiple of the block size",
                ciphertext.len()
            )));
        }

        let ephemeral_public_key = PublicKey::from_sec1_bytes(key)
            .map_err(|_| decryption_error("invalid ephemeral public key"))?;

        let mut payload = Self {
            iv: [0u8; IV_LEN],
            ephemeral_public_key,
            mac: [0u8; MAC_LEN],
            ciphertext: ciphertext.to_vec(),
        };
        payload.iv.copy_from_slice(iv);
        payload.mac.copy_from_slice(mac);
        Ok(payload)
    }
}

/// 수신자 공개키로 평문을 암호화합니다.
pub fn encrypt<R: RngCore + CryptoRng>(
    recipient: &PublicKey,
    plaintext: &[u8],
    rng: &mut R,
) -> CustodyResult<EciesPayload> {
    let ephemeral_secret = SecretKey::random(&mut *rng);
    let ephemeral_public_key = ephemeral_secret.public_key();

    let mut iv = [0u8; IV_LEN];
    rng.fill_bytes(&mut iv);

    let (enc_key, mac_key) = derive_keys(&ephemeral_secret, recipient);

    let ciphertext = Aes256CbcEnc::new_from_slices(enc_key.as_slice(), &iv)
        .map_err(|e| CustodyError::InvalidPrivateKey {
            message: format!("AES key setup failed: {e}"),
        })?
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mac = compute_mac(&mac_key, &iv, &ephemeral_public_key, &ciphertext)?.finalize().into_bytes();

    let mut payload = EciesPayload {
        iv,
        ephemeral_public_key,
        mac: [0u8; MAC_LEN],
        ciphertext,
    };
    payload.mac.copy_from_slice(&mac);
    Ok(payload)
}

/// 수신자 개인키로 복호화합니다.
pub fn decrypt(recipient: &SecretKey, payload: &EciesPayload) -> CustodyResult<Zeroizing<Vec<u8>>> {
    let (enc_key, mac_key) = derive_keys(recipient, &payload.ephemeral_public_key);

    compute_mac(&mac_key, &payload.iv, &payload.ephemeral_public_key, &payload.ciphertext)?
        .verify_slice(&payload.mac)
        .map_err(|_| decryption_error("MAC mismatch (wrong key or corrupted ciphertext)"))?;

    let plaintext = Aes256CbcDec::new_from_slices(enc_key.as_slice(), &payload.iv)
        .map_err(|e| decryption_error(format!("AES key setup failed: {e}")))?
        .decrypt_padded_vec_mut::<Pkcs7>(&payload.ciphertext)
        .map_err(|_| decryption_error("invalid padding"))?;

    Ok(Zeroizing::new(plaintext))
}

fn derive_keys(secret: &SecretKey, public: &PublicKey) -> (Zeroizing<[u8; 32]>, Zeroizing<[u8; 32]>) {
    let shared = diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());
    let hash = Sha512::digest(shared.raw_secret_bytes());

    let mut enc_key = Zeroizing::new([0u8; 32]);
    let mut mac_key = Zeroizing::new([0u8; 32]);
    enc_key.copy_from_slice(&hash[..32]);
    mac_key.copy_from_slice(&hash[32..]);
    (enc_key, mac_key)
}

fn compute_mac(
    mac_key: &[u8; 32],
    iv: &[u8],
    ephemeral_public_key: &PublicKey,
    ciphertext: &[u8],
) -> CustodyResult<HmacSha256> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(mac_key).map_err(|e| CustodyError::InvalidPrivateKey {
        message: format!("HMAC key setup failed: {e}"),
    })?;
    mac.update(iv);
    mac.update(ephemeral_public_key.to_encoded_point(false).as_bytes());
    mac.update(ciphertext);
    Ok(mac)
}

fn decryption_error(message: impl Into<String>) -> CustodyError {
    CustodyError::DecryptionFailed {
        message: message.into(),
    }
}
