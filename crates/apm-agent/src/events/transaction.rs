// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Transaction event: a named, timed unit of work.
//!
//! A transaction moves through `created -> started -> stopped`. It may be
//! registered before it is started, and a transaction created with an
//! explicit start time counts as already started.

use std::collections::HashMap;
use std::time::SystemTime;

use serde_json::{json, Value};

use crate::error::AgentError;
use crate::events::stacktrace::{self, Frame};
use crate::events::{Context, Event, EventIdentity, WireEvent};
use crate::timer::Timer;

pub const DEFAULT_RESULT: &str = "200";
pub const DEFAULT_TYPE: &str = "generic";

/// Source of response headers already sent by the host, recorded when a
/// transaction stops. Hosts without such introspection simply don't install
/// one.
pub trait ResponseHeaders: Send + Sync {
    fn sent_headers(&self) -> Option<HashMap<String, String>>;
}

/// Caller supplied result and type of a transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionMeta {
    pub result: Option<String>,
    pub kind: Option<String>,
}

impl TransactionMeta {
    pub fn new(result: impl Into<String>, kind: impl Into<String>) -> Self {
        TransactionMeta {
            result: Some(result.into()),
            kind: Some(kind.into()),
        }
    }
}

/// Outcome recorded when a transaction stops.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    /// Duration in milliseconds, rounded to microsecond precision.
    pub duration: f64,
    pub backtrace: Option<Vec<Frame>>,
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct Transaction {
    identity: EventIdentity,
    name: String,
    context: Context,
    timer: Timer,
    summary: Summary,
    backtrace_limit: usize,
    result: String,
    kind: String,
}

impl Transaction {
    /// Creates a transaction. With `start` set the transaction is backdated
    /// and already running.
    pub fn new(name: impl Into<String>, context: Context, start: Option<SystemTime>) -> Self {
        Transaction {
            identity: EventIdentity::new(),
            name: name.into(),
            context,
            timer: Timer::new(start),
            summary: Summary::default(),
            backtrace_limit: 0,
            result: DEFAULT_RESULT.to_string(),
            kind: DEFAULT_TYPE.to_string(),
        }
    }

    pub fn start(&mut self) -> Result<(), AgentError> {
        self.timer.start()?;
        Ok(())
    }

    /// Stops the timer and records the summary.
    ///
    /// `duration` (milliseconds) overrides the measured duration. Stopping
    /// again recomputes the summary from the already stopped timer.
    pub fn stop(
        &mut self,
        duration: Option<f64>,
        headers: Option<&dyn ResponseHeaders>,
    ) -> Result<(), AgentError> {
        self.timer.stop()?;

        self.summary.duration = match duration {
            Some(duration) => duration,
            None => round_to_micros(self.timer.duration_ms()?),
        };
        self.summary.headers = headers
            .and_then(|headers| headers.sent_headers())
            .unwrap_or_default();
        self.summary.backtrace = Some(stacktrace::capture(self.backtrace_limit));
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.timer.is_started()
    }

    pub fn is_stopped(&self) -> bool {
        self.timer.is_stopped()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    /// Maximum number of frames captured on stop; 0 means unlimited.
    pub fn set_backtrace_limit(&mut self, limit: usize) {
        self.backtrace_limit = limit;
    }

    pub fn backtrace_limit(&self) -> usize {
        self.backtrace_limit
    }

    /// Applies the fields set in `meta`, keeping the others.
    pub fn set_meta(&mut self, meta: TransactionMeta) {
        if let Some(result) = meta.result {
            self.result = result;
        }
        if let Some(kind) = meta.kind {
            self.kind = kind;
        }
    }

    pub fn result(&self) -> &str {
        &self.result
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }
}

fn round_to_micros(duration_ms: f64) -> f64 {
    (duration_ms * 1_000.0).round() / 1_000.0
}

impl WireEvent for Transaction {
    fn to_json(&self) -> Value {
        json!({
            "transaction": {
                "trace_id": self.trace_id(),
                "id": self.id(),
                "parent_id": self.parent_id(),
                "type": self.kind,
                "duration": self.summary.duration,
                "timestamp": self.timestamp(),
                "result": self.result,
                "name": self.name,
                "context": self.context.to_json(),
                "sampled": Value::Null,
                "span_count": {
                    "started": 0,
                    "dropped": 0,
                },
            }
        })
    }
}

impl Event for Transaction {
    fn identity(&self) -> &EventIdentity {
        &self.identity
    }

    fn identity_mut(&mut self) -> &mut EventIdentity {
        &mut self.identity
    }

    fn transaction_id(&self) -> Option<&str> {
        Some(self.id())
    }
}
