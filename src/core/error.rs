//! Error taxonomy for the selection flow and timer registry.
//!
//! Every `FlowError` is recoverable: the transport turns it into a re-prompt
//! and the conversation state stays where it was. Nothing here ever escalates
//! to a process-level failure.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Recoverable errors raised while driving the date/time selection flow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    /// The resolved target instant is not strictly in the future.
    #[error("⏳ That moment is already in the past. Pick a future date or time.")]
    InvalidTarget,

    /// Free-text time failed `HH:MM` parsing or range validation.
    #[error("❌ Couldn't read `{0}` as a time. Use HH:MM in 24-hour format.")]
    MalformedTimeInput(String),

    /// Confirmation answer was neither an affirmative nor a negative token.
    #[error("🤔 Didn't catch that (`{0}`). Please answer yes or no.")]
    UnrecognizedConfirmation(String),

    /// An action token arrived that no current state transition accepts,
    /// e.g. a stale button pressed after the flow was reset.
    #[error("This action isn't available right now ({0}).")]
    UnknownAction(String),
}

/// Errors returned by [`TimerRegistry::schedule`](crate::TimerRegistry::schedule).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    /// Lead time was zero or negative at scheduling time.
    #[error("target instant {target} is not in the future")]
    InvalidTarget { target: DateTime<Utc> },

    /// The registry refused to allocate another timer callback.
    #[error("timer registry is full ({limit} active timers)")]
    Exhausted { limit: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_error_messages_are_user_facing() {
        let err = FlowError::MalformedTimeInput("25:61".to_string());
        assert!(err.to_string().contains("25:61"));
        assert!(err.to_string().contains("HH:MM"));

        let err = FlowError::UnrecognizedConfirmation("maybe".to_string());
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn test_schedule_error_reports_limit() {
        let err = ScheduleError::Exhausted { limit: 100 };
        assert!(err.to_string().contains("100"));
    }
}
