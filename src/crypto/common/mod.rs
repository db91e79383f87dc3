//! Common cryptographic traits and utilities
//!
//! - [`traits`]: 지갑 서명 인터페이스 (WalletSigner) 및 ECDSA 서명 타입

mod traits;

pub use traits::{Signature, WalletSigner};
