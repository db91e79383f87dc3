//! Custody workflow
//!
//! - `state`: 세션 상태
//! - `session`: 상태 전이 함수와 세션 실행

mod session;
mod state;

pub use session::{CustodyReport, CustodySession};
pub use state::SessionState;
