// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error types surfaced by the agent.
//!
//! Timer and registry misuse are programmer errors and are never retried.
//! Transport failures are reported once; the batch that failed is not kept.

/// Misuse of a [`Timer`](crate::timer::Timer) state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TimerError {
    #[error("Can't start a timer which is already running")]
    AlreadyRunning,

    #[error("Can't stop a timer which isn't started")]
    NotStarted,

    #[error("Can't get the duration of a running timer")]
    NotStopped,
}

/// Errors that can occur while instrumenting and shipping events
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error(transparent)]
    Timer(#[from] TimerError),

    #[error("A transaction with the name {0} is already registered")]
    DuplicateTransactionName(String),

    #[error("The transaction {0} is not registered")]
    UnknownTransactionName(String),

    #[error("Invalid trace context header: {0:?}")]
    InvalidTraceContextHeader(String),

    #[error("No app name registered in agent config")]
    MissingAppName,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    #[error("Transport failure: {0}")]
    Transport(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = AgentError::DuplicateTransactionName("trx".to_string());
        assert_eq!(
            error.to_string(),
            "A transaction with the name trx is already registered"
        );

        let error = AgentError::InvalidTraceContextHeader(String::new());
        assert_eq!(error.to_string(), "Invalid trace context header: \"\"");
    }

    #[test]
    fn test_timer_error_is_transparent() {
        let error: AgentError = TimerError::NotStopped.into();
        assert_eq!(error.to_string(), "Can't get the duration of a running timer");
        assert!(matches!(error, AgentError::Timer(TimerError::NotStopped)));
    }

    #[test]
    fn test_error_debug() {
        let error = AgentError::MissingAppName;
        let debug_str = format!("{:?}", error);
        assert!(debug_str.contains("MissingAppName"));
    }
}
