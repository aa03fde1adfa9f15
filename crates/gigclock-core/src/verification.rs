//! Identity verification gate
//!
//! Holds the outcome of at most one verification attempt. A success
//! authorizes exactly one check-in or check-out and is then cleared.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// State of the verification gate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationState {
    #[default]
    Idle,
    InProgress,
    Succeeded,
    Failed,
}

impl std::fmt::Display for VerificationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            VerificationState::Idle => "not verified",
            VerificationState::InProgress => "verifying",
            VerificationState::Succeeded => "verified",
            VerificationState::Failed => "verification failed",
        })
    }
}

/// Misuse of the gate
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum GateError {
    #[error("Verification already in progress")]
    AlreadyInProgress,

    #[error("No verification in progress")]
    NotInProgress,
}

/// Single-slot verification gate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationGate {
    state: VerificationState,
}

impl VerificationGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> VerificationState {
        self.state
    }

    /// Start an attempt. Any earlier unconsumed outcome is discarded.
    pub fn begin(&mut self) -> Result<(), GateError> {
        if self.state == VerificationState::InProgress {
            return Err(GateError::AlreadyInProgress);
        }
        self.state = VerificationState::InProgress;
        Ok(())
    }

    /// Record the outcome of the attempt in progress
    pub fn resolve(&mut self, success: bool) -> Result<VerificationState, GateError> {
        if self.state != VerificationState::InProgress {
            return Err(GateError::NotInProgress);
        }
        self.state = if success {
            VerificationState::Succeeded
        } else {
            VerificationState::Failed
        };
        Ok(self.state)
    }

    /// Return to idle, dropping any outcome
    pub fn reset(&mut self) {
        self.state = VerificationState::Idle;
    }

    /// Whether the gate currently authorizes a transition
    pub fn is_satisfied(&self, required: bool) -> bool {
        !required || self.state == VerificationState::Succeeded
    }

    /// Take the outcome for a transition that is being committed.
    ///
    /// Returns whether the transition counts as verified and resets the gate.
    pub(crate) fn consume(&mut self) -> bool {
        let verified = self.state == VerificationState::Succeeded;
        self.reset();
        verified
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_successful_attempt() {
        let mut gate = VerificationGate::new();
        assert_eq!(gate.state(), VerificationState::Idle);
        assert!(!gate.is_satisfied(true));
        assert!(gate.is_satisfied(false));

        gate.begin().unwrap();
        assert_eq!(gate.state(), VerificationState::InProgress);
        assert!(!gate.is_satisfied(true));

        assert_eq!(gate.resolve(true), Ok(VerificationState::Succeeded));
        assert!(gate.is_satisfied(true));
    }

    #[test]
    fn test_begin_while_in_progress() {
        let mut gate = VerificationGate::new();
        gate.begin().unwrap();
        assert_eq!(gate.begin(), Err(GateError::AlreadyInProgress));
        assert_eq!(gate.state(), VerificationState::InProgress);
    }

    #[test]
    fn test_resolve_without_attempt() {
        let mut gate = VerificationGate::new();
        assert_eq!(gate.resolve(true), Err(GateError::NotInProgress));
        assert_eq!(gate.state(), VerificationState::Idle);
    }

    #[test]
    fn test_retry_after_failure() {
        let mut gate = VerificationGate::new();
        gate.begin().unwrap();
        assert_eq!(gate.resolve(false), Ok(VerificationState::Failed));
        assert!(!gate.is_satisfied(true));

        gate.begin().unwrap();
        gate.resolve(true).unwrap();
        assert!(gate.is_satisfied(true));
    }

    #[test]
    fn test_success_is_single_use() {
        let mut gate = VerificationGate::new();
        gate.begin().unwrap();
        gate.resolve(true).unwrap();

        assert!(gate.consume());
        assert_eq!(gate.state(), VerificationState::Idle);
        assert!(!gate.is_satisfied(true));
        assert!(!gate.consume());
    }

    #[test]
    fn test_reset_abandons_attempt() {
        let mut gate = VerificationGate::new();
        gate.begin().unwrap();
        gate.reset();
        assert_eq!(gate.state(), VerificationState::Idle);
        assert_eq!(gate.resolve(true), Err(GateError::NotInProgress));
    }
}
