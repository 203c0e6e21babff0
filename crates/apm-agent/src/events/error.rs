// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error event wrapping a captured fault.
//!
//! Errors are not held in the registry; they go straight to the connector.
//! When created with a parent transaction, the error joins that
//! transaction's trace and references it as both parent and transaction.

use std::panic::Location;

use serde_json::{json, Value};

use crate::events::stacktrace::{self, Frame};
use crate::events::{Context, Event, EventIdentity, WireEvent};

/// Description of a fault, independent of how the host represents errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub message: String,
    pub type_name: String,
    pub code: i64,
    pub file: String,
    pub line: u32,
    pub frames: Vec<Frame>,
}

impl Fault {
    /// Creates a fault located at the caller, with the current call stack.
    #[track_caller]
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        let location = Location::caller();
        Fault {
            message: message.into(),
            type_name: type_name.into(),
            code: 0,
            file: location.file().to_string(),
            line: location.line(),
            frames: stacktrace::capture(0),
        }
    }

    /// Creates a fault from any error value. The type name is the error's
    /// Rust type and the message its `Display` output.
    #[track_caller]
    pub fn from_error<E>(err: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        Self::new(std::any::type_name::<E>(), err.to_string())
    }

    #[must_use]
    pub fn with_code(mut self, code: i64) -> Self {
        self.code = code;
        self
    }

    #[must_use]
    pub fn with_location(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = file.into();
        self.line = line;
        self
    }

    /// Replaces the captured call stack.
    #[must_use]
    pub fn with_frames(mut self, frames: Vec<Frame>) -> Self {
        self.frames = frames;
        self
    }

    /// `file:line` where the fault originated.
    pub fn culprit(&self) -> String {
        format!("{}:{}", self.file, self.line)
    }
}

#[derive(Debug, Clone)]
pub struct Error {
    identity: EventIdentity,
    transaction_id: Option<String>,
    fault: Fault,
    context: Context,
}

impl Error {
    pub fn new(fault: Fault, context: Context, parent: Option<&dyn Event>) -> Self {
        let identity = match parent {
            Some(parent) => EventIdentity::child_of(parent.identity()),
            None => EventIdentity::new(),
        };
        Error {
            identity,
            transaction_id: parent
                .and_then(|parent| parent.transaction_id())
                .map(str::to_string),
            fault,
            context,
        }
    }

    pub fn fault(&self) -> &Fault {
        &self.fault
    }

    pub fn context(&self) -> &Context {
        &self.context
    }
}

impl WireEvent for Error {
    fn to_json(&self) -> Value {
        json!({
            "error": {
                "id": self.id(),
                "transaction_id": self.transaction_id,
                "parent_id": self.parent_id(),
                "trace_id": self.trace_id(),
                "timestamp": self.timestamp(),
                "context": self.context.to_json(),
                "culprit": self.fault.culprit(),
                "exception": {
                    "message": self.fault.message,
                    "type": self.fault.type_name,
                    "code": self.fault.code,
                    "stacktrace": self.fault.frames,
                },
            }
        })
    }
}

impl Event for Error {
    fn identity(&self) -> &EventIdentity {
        &self.identity
    }

    fn identity_mut(&mut self) -> &mut EventIdentity {
        &mut self.identity
    }

    fn transaction_id(&self) -> Option<&str> {
        self.transaction_id.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::span::Span;
    use crate::events::transaction::Transaction;

    #[derive(Debug, thiserror::Error)]
    #[error("connection refused")]
    struct ConnectionError;

    #[test]
    fn test_fault_from_error() {
        let line = line!() + 1;
        let fault = Fault::from_error(&ConnectionError);

        assert_eq!(fault.message, "connection refused");
        assert!(fault.type_name.ends_with("ConnectionError"));
        assert_eq!(fault.code, 0);
        assert_eq!(fault.line, line);
        assert!(fault.file.ends_with("error.rs"));
        assert!(!fault.frames.is_empty());
    }

    #[test]
    fn test_error_without_parent() {
        let error = Error::new(Fault::new("Panic", "boom"), Context::default(), None);
        assert_eq!(error.parent_id(), None);

        let json = error.to_json();
        assert_eq!(json["error"]["transaction_id"], Value::Null);
        assert_eq!(json["error"]["parent_id"], Value::Null);
        assert_eq!(json["error"]["trace_id"], error.trace_id());
    }

    #[test]
    fn test_error_linked_to_transaction() {
        let transaction = Transaction::new("trx", Context::default(), None);
        let error = Error::new(
            Fault::new("Panic", "boom"),
            Context::default(),
            Some(&transaction),
        );

        assert_eq!(error.trace_id(), transaction.trace_id());
        assert_eq!(error.parent_id(), Some(transaction.id()));

        let json = error.to_json();
        assert_eq!(json["error"]["transaction_id"], transaction.id());
        assert_eq!(json["error"]["parent_id"], transaction.id());
    }

    #[test]
    fn test_error_inside_span_reports_its_transaction() {
        let transaction = Transaction::new("trx", Context::default(), None);
        let span = Span::new("SELECT users", &transaction);
        let error = Error::new(Fault::new("Panic", "boom"), Context::default(), Some(&span));

        assert_eq!(error.parent_id(), Some(span.id()));
        assert_eq!(error.transaction_id(), Some(transaction.id()));

        let json = error.to_json();
        assert_eq!(json["error"]["transaction_id"], transaction.id());
        assert_eq!(json["error"]["parent_id"], span.id());
    }

    #[test]
    fn test_error_wire_shape() {
        let fault = Fault::new("std::io::Error", "disk full")
            .with_code(28)
            .with_location("/srv/app/src/store.rs", 17)
            .with_frames(vec![
                Frame::new("write").with_location("/srv/app/src/store.rs", 17),
                Frame::new("main"),
            ]);
        let error = Error::new(fault, Context::default(), None);

        let json = error.to_json();
        let exception = &json["error"]["exception"];
        assert_eq!(json["error"]["culprit"], "/srv/app/src/store.rs:17");
        assert_eq!(exception["message"], "disk full");
        assert_eq!(exception["type"], "std::io::Error");
        assert_eq!(exception["code"], 28);
        assert_eq!(
            exception["stacktrace"],
            json!([
                {"function": "write", "lineno": 17, "filename": "store.rs", "abs_path": "/srv/app/src/store.rs"},
                {"function": "main", "lineno": 0, "filename": "(anonymous)"},
            ])
        );
    }
}
