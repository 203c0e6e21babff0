// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The agent: entry point for instrumented code.
//!
//! An agent owns the transaction registry, the connector and the context
//! shared by every event it creates. Typical use for one unit of work:
//!
//! ```rust,no_run
//! # async fn run() -> apm_agent::Result<()> {
//! use apm_agent::{Agent, Config, Context, TransactionMeta};
//!
//! let mut agent = Agent::new(Config::new("checkout"), Context::default())?;
//! agent.start_transaction("GET /cart", Context::default(), None)?;
//! // ... handle the request ...
//! agent.stop_transaction("GET /cart", TransactionMeta::new("HTTP 2xx", "request"))?;
//! agent.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! Nothing is sent until [`Agent::send`] or [`Agent::shutdown`] is awaited.
//! Dropping an agent does no I/O.

use std::sync::Arc;
use std::time::SystemTime;

use reqwest::Response;
use tracing::{debug, warn};

use crate::config::Config;
use crate::connector::Connector;
use crate::error::{AgentError, Result};
use crate::events::error::Fault;
use crate::events::factory::{DefaultEventFactory, EventFactory};
use crate::events::metadata::Metadata;
use crate::events::transaction::{ResponseHeaders, Transaction, TransactionMeta};
use crate::events::{Context, Event, WireEvent};
use crate::stores::TransactionsStore;

pub struct Agent {
    config: Arc<Config>,
    shared_context: Context,
    factory: Box<dyn EventFactory>,
    response_headers: Option<Box<dyn ResponseHeaders>>,
    transactions: TransactionsStore,
    connector: Connector,
    metadata: Metadata,
}

impl Agent {
    /// Validates `config` and builds an agent. The configured environment
    /// variable names are added to `shared_context`.
    pub fn new(config: Config, shared_context: Context) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);

        let base = Context {
            env: config.env.clone(),
            ..Context::default()
        };
        let shared_context = base.merged(&shared_context);

        let metadata = Metadata::new(&config);
        let mut connector = Connector::new(Arc::clone(&config))?;
        connector.put_event(&metadata);

        debug!(
            "Agent | Started for {} reporting to {}",
            config.app_name, config.server_url
        );
        Ok(Agent {
            config,
            shared_context,
            factory: Box::new(DefaultEventFactory),
            response_headers: None,
            transactions: TransactionsStore::new(),
            connector,
            metadata,
        })
    }

    #[must_use]
    pub fn with_event_factory(mut self, factory: impl EventFactory + 'static) -> Self {
        self.factory = Box::new(factory);
        self
    }

    /// Installs the hook queried for sent response headers whenever a
    /// transaction stops.
    #[must_use]
    pub fn with_response_headers(mut self, headers: impl ResponseHeaders + 'static) -> Self {
        self.response_headers = Some(Box::new(headers));
        self
    }

    /// Creates and registers a transaction.
    ///
    /// The transaction is started now, unless `start` is given, in which
    /// case it counts as running since then.
    pub fn start_transaction(
        &mut self,
        name: &str,
        context: Context,
        start: Option<SystemTime>,
    ) -> Result<&mut Transaction> {
        let context = self.event_context(&context);
        let transaction = self.factory.new_transaction(name, context, start);
        let transaction = self.transactions.register(transaction)?;
        if !transaction.is_started() {
            transaction.start()?;
        }
        Ok(transaction)
    }

    /// Stops a registered transaction and records its result and type.
    pub fn stop_transaction(&mut self, name: &str, meta: TransactionMeta) -> Result<()> {
        let transaction = self
            .transactions
            .fetch_mut(name)
            .ok_or_else(|| AgentError::UnknownTransactionName(name.to_string()))?;

        transaction.set_backtrace_limit(self.config.backtrace_limit);
        transaction.stop(None, self.response_headers.as_deref())?;
        transaction.set_meta(meta);
        Ok(())
    }

    pub fn get_transaction(&self, name: &str) -> Result<&Transaction> {
        self.transactions
            .fetch(name)
            .ok_or_else(|| AgentError::UnknownTransactionName(name.to_string()))
    }

    pub fn get_transaction_mut(&mut self, name: &str) -> Result<&mut Transaction> {
        self.transactions
            .fetch_mut(name)
            .ok_or_else(|| AgentError::UnknownTransactionName(name.to_string()))
    }

    /// Reports a fault. With a `parent` the error joins its trace.
    ///
    /// Errors go straight to the connector and are sent with the next batch.
    pub fn capture_throwable(&mut self, fault: Fault, context: Context, parent: Option<&dyn Event>) {
        let context = self.event_context(&context);
        let error = self.factory.new_error(fault, context, parent);
        self.put_event(&error);
    }

    /// Like [`capture_throwable`](Self::capture_throwable), with the
    /// registered transaction `transaction_name` as parent.
    pub fn capture_throwable_in(
        &mut self,
        fault: Fault,
        context: Context,
        transaction_name: &str,
    ) -> Result<()> {
        let context = self.event_context(&context);
        let error = {
            let parent = self.get_transaction(transaction_name)?;
            self.factory.new_error(fault, context, Some(parent))
        };
        self.put_event(&error);
        Ok(())
    }

    /// Queues an event for the next batch. A batch always starts with the
    /// metadata event.
    pub fn put_event<E: WireEvent + ?Sized>(&mut self, event: &E) {
        if !self.connector.is_payload_set() {
            self.connector.put_event(&self.metadata);
        }
        self.connector.put_event(event);
    }

    /// Sends every registered transaction and queued event.
    ///
    /// The registry is emptied whatever the outcome. An inactive agent
    /// discards everything and reports success without any network call.
    pub async fn send(&mut self) -> Result<bool> {
        if !self.config.active {
            debug!(
                "Agent | Inactive, discarding {} transactions",
                self.transactions.len()
            );
            self.transactions.reset();
            self.connector.discard_payload();
            return Ok(true);
        }

        if self.transactions.is_empty() && !self.connector.is_payload_set() {
            debug!("Agent | Nothing to send");
            return Ok(true);
        }

        if !self.connector.is_payload_set() {
            self.connector.put_event(&self.metadata);
        }
        for transaction in self.transactions.drain() {
            self.connector.put_event(&transaction);
        }

        self.connector.commit().await
    }

    /// Final flush. Consumes the agent so nothing can be recorded after it.
    pub async fn shutdown(mut self) -> Result<bool> {
        self.send().await
    }

    /// Queries the APM server root.
    pub async fn info(&self) -> Result<Response> {
        self.connector.get_info().await
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn factory(&self) -> &dyn EventFactory {
        self.factory.as_ref()
    }

    pub fn shared_context(&self) -> &Context {
        &self.shared_context
    }

    fn event_context(&self, context: &Context) -> Context {
        let mut context = self.shared_context.merged(context);
        if !self.config.cookies.is_empty() {
            context.retain_cookies(&self.config.cookies);
        }
        context
    }
}

impl Drop for Agent {
    fn drop(&mut self) {
        if self.config.active && !self.transactions.is_empty() {
            warn!(
                "Agent | Dropped with {} unsent transactions, call shutdown() to send them",
                self.transactions.len()
            );
        }
    }
}
