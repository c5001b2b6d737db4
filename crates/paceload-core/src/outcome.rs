use serde::{Deserialize, Serialize};

/// Result of a single write attempt, as classified by the sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteOutcome {
    Succeeded,
    /// Expected to succeed if the identical record is written again.
    FailedTransient(String),
    /// Will fail again with identical input.
    FailedPermanent(String),
}

impl WriteOutcome {
    pub fn transient(reason: impl Into<String>) -> Self {
        WriteOutcome::FailedTransient(reason.into())
    }

    pub fn permanent(reason: impl Into<String>) -> Self {
        WriteOutcome::FailedPermanent(reason.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, WriteOutcome::Succeeded)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Transient failures used up the whole attempt budget.
    RetriesExhausted,
    Permanent,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::RetriesExhausted => write!(f, "retries-exhausted"),
            FailureKind::Permanent => write!(f, "permanent"),
        }
    }
}

/// Terminal failure of one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFailure {
    /// 1-based position of the record in the source.
    pub position: u64,
    pub key: String,
    pub kind: FailureKind,
    pub attempts: u32,
    pub reason: String,
}

/// Attempt counter for the record currently in flight.
#[derive(Debug, Clone, Copy)]
pub struct RetryState {
    attempts: u32,
    max_attempts: u32,
}

impl RetryState {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempts: 0,
            max_attempts,
        }
    }

    pub fn record_attempt(&mut self) {
        self.attempts += 1;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// True once `max_attempts` attempts have been made.
    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_state_budget() {
        let mut state = RetryState::new(3);
        assert_eq!(state.attempts(), 0);
        assert!(!state.is_exhausted());

        state.record_attempt();
        state.record_attempt();
        assert!(!state.is_exhausted());

        state.record_attempt();
        assert_eq!(state.attempts(), 3);
        assert!(state.is_exhausted());
    }

    #[test]
    fn test_single_attempt_budget() {
        let mut state = RetryState::new(1);
        state.record_attempt();
        assert!(state.is_exhausted());
    }

    #[test]
    fn test_outcome_constructors() {
        assert_eq!(
            WriteOutcome::transient("timeout"),
            WriteOutcome::FailedTransient("timeout".to_string())
        );
        assert!(!WriteOutcome::permanent("bad row").is_success());
        assert!(WriteOutcome::Succeeded.is_success());
    }
}
