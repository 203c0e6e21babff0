// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use core::time::Duration;
use reqwest::ClientBuilder;

use crate::error::AgentError;

/// Creates a reqwest client builder with TLS configuration.
/// With the "rustls" feature it uses reqwest's rustls TLS implementation.
#[cfg(feature = "rustls")]
fn create_reqwest_client_builder() -> ClientBuilder {
    reqwest::Client::builder().use_rustls_tls()
}

#[cfg(not(feature = "rustls"))]
fn create_reqwest_client_builder() -> ClientBuilder {
    reqwest::Client::builder()
}

/// Builds a reqwest client with optional proxy configuration and timeout.
pub fn build_client(
    proxy_url: Option<&str>,
    timeout: Duration,
) -> Result<reqwest::Client, AgentError> {
    let mut builder = create_reqwest_client_builder().timeout(timeout);
    if let Some(proxy) = proxy_url {
        let proxy = reqwest::Proxy::https(proxy)
            .map_err(|e| AgentError::HttpClient(format!("invalid proxy url {proxy}: {e}")))?;
        builder = builder.proxy(proxy);
    }
    builder
        .build()
        .map_err(|e| AgentError::HttpClient(e.to_string()))
}
