use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DuelError {
    #[error("Invalid bundle: {0}")]
    InvalidBundle(String),

    #[error("Action '{action}' not allowed while {phase}")]
    ActionOutOfPhase { action: &'static str, phase: String },

    #[error("Stale timer fired for session {session_id} (seq {seq})")]
    StaleTimerFired { session_id: Uuid, seq: u64 },

    #[error("Invalid timing: {0}")]
    InvalidTiming(String),

    #[error("Unknown product: {0}")]
    UnknownProduct(String),

    #[error("Provider error: {0}")]
    Provider(String),
}

impl DuelError {
    /// Errors that callers swallow: the request simply had no effect.
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            DuelError::ActionOutOfPhase { .. } | DuelError::StaleTimerFired { .. }
        )
    }
}

pub type DuelResult<T> = Result<T, DuelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_benign_classification() {
        let out_of_phase = DuelError::ActionOutOfPhase {
            action: "hold",
            phase: "terminated".to_string(),
        };
        let stale = DuelError::StaleTimerFired {
            session_id: Uuid::nil(),
            seq: 3,
        };
        assert!(out_of_phase.is_benign());
        assert!(stale.is_benign());
        assert!(!DuelError::InvalidBundle("empty path".into()).is_benign());
        assert!(!DuelError::UnknownProduct("x".into()).is_benign());
    }
}
