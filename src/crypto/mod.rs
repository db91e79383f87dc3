//! Custody Cryptographic Utilities
//!
//! # 모듈 구조
//!
//! - `common`: 지갑 서명 트레이트 및 ECDSA 서명 타입
//! - `evm`: EVM 호환 체인용 (Keccak256, EIP-712, secp256k1, ECIES)
//! - `starkex`: StarkEx용 (Stark 곡선, Pedersen, 전송 서명)
//!
//! # 사용 예시
//!
//! ```rust,ignore
//! use starkex_custody::crypto::starkex::{StarkKeyPair, TransferOrder, sign};
//!
//! let keys = StarkKeyPair::from_seed_hex(&trading_key_hex)?;
//! let order = TransferOrder::new(sender_vault, receiver_vault, amount, nonce, expiry, token, receiver)?;
//! let signature = sign(keys.private_key(), &order.digest()?)?;
//! ```

pub mod common;
pub mod evm;
pub mod starkex;

pub use common::{Signature, WalletSigner};
pub use evm::{keccak256, Eip712Domain, Eip712TypedData, EvmWallet, TypedDataField};
pub use starkex::{StarkKeyPair, StarkSignature, TransferOrder};
