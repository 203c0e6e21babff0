// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::time::SystemTime;

use crate::events::error::{Error, Fault};
use crate::events::metricset::Metricset;
use crate::events::span::Span;
use crate::events::transaction::Transaction;
use crate::events::{Context, Event};

/// Constructs the events the agent reports. Install a custom factory with
/// [`Agent::with_event_factory`](crate::agent::Agent::with_event_factory) to
/// decorate or replace them.
pub trait EventFactory: Send + Sync {
    fn new_transaction(
        &self,
        name: &str,
        context: Context,
        start: Option<SystemTime>,
    ) -> Transaction {
        Transaction::new(name, context, start)
    }

    fn new_error(&self, fault: Fault, context: Context, parent: Option<&dyn Event>) -> Error {
        Error::new(fault, context, parent)
    }

    fn new_span(&self, name: &str, parent: &dyn Event) -> Span {
        Span::new(name, parent)
    }

    fn new_metricset(
        &self,
        samples: BTreeMap<String, f64>,
        tags: BTreeMap<String, String>,
    ) -> Metricset {
        Metricset::new(samples, tags)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEventFactory;

impl EventFactory for DefaultEventFactory {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::transaction::TransactionMeta;

    struct BackgroundJobs;

    impl EventFactory for BackgroundJobs {
        fn new_transaction(
            &self,
            name: &str,
            context: Context,
            start: Option<SystemTime>,
        ) -> Transaction {
            let mut transaction = Transaction::new(name, context, start);
            transaction.set_meta(TransactionMeta {
                result: None,
                kind: Some("job".to_string()),
            });
            transaction
        }
    }

    #[test]
    fn test_default_factory() {
        let factory = DefaultEventFactory;
        let transaction = factory.new_transaction("trx", Context::default(), None);
        let span = factory.new_span("query", &transaction);
        let error = factory.new_error(
            Fault::new("Panic", "boom"),
            Context::default(),
            Some(&transaction),
        );
        let metricset = factory.new_metricset(BTreeMap::new(), BTreeMap::new());

        assert_eq!(transaction.name(), "trx");
        assert_eq!(span.parent_id(), Some(transaction.id()));
        assert_eq!(error.trace_id(), transaction.trace_id());
        assert!(metricset.samples().is_empty());
    }

    #[test]
    fn test_overridden_constructor() {
        let transaction = BackgroundJobs.new_transaction("nightly", Context::default(), None);
        assert_eq!(transaction.kind(), "job");
        assert_eq!(transaction.result(), "200");
    }
}
