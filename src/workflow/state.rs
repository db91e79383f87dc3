//! Custody session states

use std::fmt;

/// 세션 상태
///
/// ```text
/// Unregistered ─┬─> Registering ───┬─> Ready ─> Depositing ─> Withdrawing ─> Complete
///               └─> RecoveringKey ─┘
/// (어느 단계에서든 실패하면 Aborted)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Unregistered,
    Registering,
    RecoveringKey,
    Ready,
    Depositing,
    Withdrawing,
    Complete,
    Aborted,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Unregistered => "unregistered",
            SessionState::Registering => "registering",
            SessionState::RecoveringKey => "recovering_key",
            SessionState::Ready => "ready",
            SessionState::Depositing => "depositing",
            SessionState::Withdrawing => "withdrawing",
            SessionState::Complete => "complete",
            SessionState::Aborted => "aborted",
        }
    }

    /// 더 이상 진행할 수 없는 상태
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Complete | SessionState::Aborted)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
