// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! # APM Agent
//!
//! Instrumentation client for an APM server. Application code opens named
//! transactions, reports faults, and the agent ships everything as
//! newline-delimited JSON to `{server_url}/intake/v2/events`.
//!
//! ## Modules
//!
//! - [`agent`]: transaction lifecycle, error capture and flushing
//! - [`events`]: transaction, error, span, metricset and metadata events
//! - [`trace_context`]: `traceparent` header parsing and rendering
//! - [`connector`]: payload buffer and intake transport
//! - [`stores`]: registry of in-flight transactions
//! - [`timer`]: start/stop duration measurement
//! - [`config`]: agent configuration, from code or `ELASTIC_APM_*` variables
//! - [`logger`]: `APM_AGENT` log formatter

#![deny(clippy::all)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]

pub mod agent;
pub mod config;
pub mod connector;
pub mod error;
pub mod events;
pub mod hostname;
pub mod http_utils;
pub mod logger;
pub mod stores;
pub mod timer;
pub mod trace_context;

pub use agent::Agent;
pub use config::Config;
pub use error::{AgentError, Result, TimerError};
pub use events::error::{Error, Fault};
pub use events::factory::{DefaultEventFactory, EventFactory};
pub use events::transaction::{ResponseHeaders, Transaction, TransactionMeta};
pub use events::{Context, Event, WireEvent};
pub use trace_context::TraceContext;
