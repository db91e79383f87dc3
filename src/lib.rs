//! StarkEx Custody: trading key escrow and transfer authorization
//!
//! StarkEx 계열 L2 거래소(rhino.fi)의 거래 키 수탁과 출금 서명을 자동화합니다.
//!
//! - 거래 키(dtk) 생성과 Stark 키 파생
//! - 지갑 서명에서 파생한 키로 ECIES 에스크로 및 복구
//! - TransferRequest 패킹, Pedersen 해시, Stark 서명
//! - 등록/복구 → 입금 → 출금 세션 상태 머신
//!
//! # 사용 예시
//!
//! ```rust,ignore
//! use starkex_custody::{CustodySession, EvmWallet, HttpRhinoApi, RhinoConfig};
//! use std::sync::Arc;
//!
//! let config = RhinoConfig::from_env()?;
//! let api = Arc::new(HttpRhinoApi::new(&config)?);
//! let wallet = Arc::new(EvmWallet::from_private_key(&private_key)?);
//!
//! let mut session = CustodySession::new(config, api, wallet, depositor, dec!(0.01));
//! let report = session.run().await?;
//! ```

pub mod client;
pub mod crypto;
pub mod custody;
pub mod errors;
pub mod rhino;
pub mod workflow;

// Re-exports
pub use client::{HttpClient, RetryConfig, RhinoConfig};
pub use crypto::{EvmWallet, Signature, StarkKeyPair, StarkSignature, TransferOrder, WalletSigner};
pub use custody::{EncryptedTradingKey, TradingKey, TradingKeyCipher};
pub use errors::{CustodyError, CustodyResult};
pub use rhino::{DepositRequest, DepositSubmitter, HttpRhinoApi, RhinoApi};
pub use workflow::{CustodyReport, CustodySession, SessionState};
