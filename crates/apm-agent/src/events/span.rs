// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Span event: a timed operation inside a transaction.

use std::time::SystemTime;

use serde_json::{json, Value};

use crate::error::AgentError;
use crate::events::{Event, EventIdentity, WireEvent};
use crate::timer::Timer;

pub const DEFAULT_SPAN_TYPE: &str = "request";

/// A child of a transaction or of another span. Its timer starts when the
/// span is created.
#[derive(Debug, Clone)]
pub struct Span {
    identity: EventIdentity,
    transaction_id: String,
    name: String,
    kind: String,
    timer: Timer,
    duration: f64,
}

impl Span {
    /// Nested spans report the transaction of their parent span.
    pub fn new(name: impl Into<String>, parent: &dyn Event) -> Self {
        Span {
            identity: EventIdentity::child_of(parent.identity()),
            transaction_id: parent.transaction_id().unwrap_or(parent.id()).to_string(),
            name: name.into(),
            kind: DEFAULT_SPAN_TYPE.to_string(),
            timer: Timer::new(Some(SystemTime::now())),
            duration: 0.0,
        }
    }

    /// Stops the span. `duration` (milliseconds) overrides the measured one.
    pub fn stop(&mut self, duration: Option<f64>) -> Result<(), AgentError> {
        self.timer.stop()?;
        self.duration = match duration {
            Some(duration) => duration,
            None => self.timer.duration_ms()?,
        };
        Ok(())
    }

    pub fn set_kind(&mut self, kind: impl Into<String>) {
        self.kind = kind.into();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }
}

impl WireEvent for Span {
    fn to_json(&self) -> Value {
        json!({
            "span": {
                "id": self.id(),
                "transaction_id": self.transaction_id,
                "trace_id": self.trace_id(),
                "parent_id": self.parent_id(),
                "name": self.name,
                "type": self.kind,
                "duration": self.duration,
                "timestamp": self.timestamp(),
            }
        })
    }
}

impl Event for Span {
    fn identity(&self) -> &EventIdentity {
        &self.identity
    }

    fn identity_mut(&mut self) -> &mut EventIdentity {
        &mut self.identity
    }

    fn transaction_id(&self) -> Option<&str> {
        Some(&self.transaction_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::transaction::Transaction;
    use crate::events::Context;
    use std::thread::sleep;
    use std::time::Duration;

    #[test]
    fn test_span_joins_transaction_trace() {
        let transaction = Transaction::new("trx", Context::default(), None);
        let span = Span::new("SELECT users", &transaction);

        assert_eq!(span.trace_id(), transaction.trace_id());
        assert_eq!(span.parent_id(), Some(transaction.id()));
        assert_eq!(span.transaction_id(), Some(transaction.id()));
    }

    #[test]
    fn test_nested_span_keeps_transaction_id() {
        let transaction = Transaction::new("trx", Context::default(), None);
        let outer = Span::new("render", &transaction);
        let inner = Span::new("partial", &outer);

        assert_eq!(inner.parent_id(), Some(outer.id()));
        assert_eq!(inner.transaction_id(), Some(transaction.id()));
        assert_eq!(inner.trace_id(), transaction.trace_id());
    }

    #[test]
    fn test_span_timer_runs_from_creation() {
        let transaction = Transaction::new("trx", Context::default(), None);
        let mut span = Span::new("SELECT users", &transaction);

        assert!(span.timer.is_started());
        assert!(!span.timer.is_stopped());
        assert!(span.timer.elapsed().is_ok());

        span.stop(Some(2.5)).unwrap();
        assert_eq!(span.duration(), 2.5);
        assert!(span.timer.is_stopped());
    }

    #[test]
    fn test_span_stop_and_wire_shape() {
        let transaction = Transaction::new("trx", Context::default(), None);
        let mut span = Span::new("SELECT users", &transaction);
        span.set_kind("db.mysql.query");
        sleep(Duration::from_millis(5));
        span.stop(None).unwrap();
        assert!(span.duration() >= 5.0);

        let json = span.to_json();
        assert_eq!(json["span"]["name"], "SELECT users");
        assert_eq!(json["span"]["type"], "db.mysql.query");
        assert_eq!(json["span"]["transaction_id"], transaction.id());
    }
}
