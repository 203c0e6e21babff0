// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Transport to the APM intake.
//!
//! Events are serialized when they are queued. A commit joins the queued
//! lines into one NDJSON body and POSTs it to `{server_url}/intake/v2/events`.
//!
//! The queue is emptied before the request is sent, so a failed commit loses
//! its batch. Nothing is retried.

use std::sync::Arc;
use std::time::Instant;

use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, RequestBuilder, Response};
use tracing::{debug, error};

use crate::config::Config;
use crate::error::Result;
use crate::events::metadata::{AGENT_NAME, AGENT_VERSION};
use crate::events::WireEvent;
use crate::http_utils::build_client;

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

pub struct Connector {
    config: Arc<Config>,
    client: reqwest::Client,
    payload: Vec<String>,
}

impl Connector {
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let client = build_client(config.proxy_url.as_deref(), config.timeout)?;
        Ok(Connector {
            config,
            client,
            payload: Vec::new(),
        })
    }

    /// Serializes `event` and appends it to the payload.
    pub fn put_event<E: WireEvent + ?Sized>(&mut self, event: &E) {
        self.payload.push(event.to_json().to_string());
    }

    /// Whether any event is waiting to be committed.
    pub fn is_payload_set(&self) -> bool {
        !self.payload.is_empty()
    }

    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// Drops every queued event without sending it.
    pub fn discard_payload(&mut self) {
        self.payload.clear();
    }

    /// Sends the queued events to the intake.
    ///
    /// Returns `Ok(true)` on a 2xx response (or when nothing is queued),
    /// `Ok(false)` when the intake answers with another status, and
    /// `Err(AgentError::Transport)` when the request could not be made.
    pub async fn commit(&mut self) -> Result<bool> {
        if self.payload.is_empty() {
            debug!("Connector | Nothing to commit");
            return Ok(true);
        }

        let n_events = self.payload.len();
        let body = self.payload.join("\n");
        self.payload.clear();

        let url = self.config.intake_url();
        debug!("Connector | Committing {n_events} events to {url}");
        let time = Instant::now();
        let response = self
            .request(Method::POST, &url)
            .header(CONTENT_TYPE, NDJSON_CONTENT_TYPE)
            .body(body)
            .send()
            .await;
        let elapsed = time.elapsed();

        match response {
            Ok(r) => {
                let status = r.status();
                if status.is_success() {
                    debug!(
                        "Connector | Committed {n_events} events in {} ms",
                        elapsed.as_millis()
                    );
                    Ok(true)
                } else {
                    let body = r.text().await.unwrap_or_default();
                    error!(
                        "Connector | Intake rejected {n_events} events with status {status}: {body:?}"
                    );
                    Ok(false)
                }
            }
            Err(e) => {
                error!("Connector | Failed to send request, dropping {n_events} events: {e}");
                Err(e.into())
            }
        }
    }

    /// Queries the server root. The response is returned as is.
    pub async fn get_info(&self) -> Result<Response> {
        let response = self
            .request(Method::GET, &self.config.server_url)
            .send()
            .await?;
        Ok(response)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, url)
            .header(USER_AGENT, user_agent())
            .header(ACCEPT, "application/json");
        if let Some(token) = &self.config.secret_token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        builder
    }
}

fn user_agent() -> String {
    format!("{AGENT_NAME}/{AGENT_VERSION}")
}
