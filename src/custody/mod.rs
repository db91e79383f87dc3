//! Trading key custody
//!
//! - `escrow`: 거래 키 생성, 에스크로 키 파생, ECIES 암호화/복구

mod escrow;

pub use escrow::{
    derive_encryption_key, registration_typed_data, EncryptedTradingKey, EncryptionKeyMaterial,
    TradingKey, TradingKeyCipher, DTK_VERSION,
};
