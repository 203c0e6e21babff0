// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::time::Duration;

use crate::error::AgentError;
use crate::hostname::get_hostname;
use crate::logger;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8200";
pub const DEFAULT_ENVIRONMENT: &str = "development";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Agent configuration. Read-only once the agent is built.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Service name reported in metadata; required
    pub app_name: String,
    pub app_version: String,
    /// Base URL of the intake server, without a trailing path
    pub server_url: String,
    /// Sent as `Authorization: Bearer <token>` when set
    pub secret_token: Option<String>,
    pub hostname: String,
    /// An inactive agent never talks to the server
    pub active: bool,
    pub timeout: Duration,
    /// Names of environment variables attached to every event context
    pub env: Vec<String>,
    /// Cookie names kept in event contexts; empty keeps all
    pub cookies: Vec<String>,
    pub environment: String,
    /// Frames captured when a transaction stops; 0 means unlimited
    pub backtrace_limit: usize,
    pub proxy_url: Option<String>,
    /// Filter handed to [`logger::init`](crate::logger::init) by the host;
    /// a level or any `EnvFilter` directive
    pub log_level: String,
}

impl Config {
    /// Default configuration for the given service name.
    pub fn new(app_name: impl Into<String>) -> Self {
        Config {
            app_name: app_name.into(),
            app_version: String::new(),
            server_url: DEFAULT_SERVER_URL.to_string(),
            secret_token: None,
            hostname: get_hostname(),
            active: true,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            env: vec!["SERVER_SOFTWARE".to_string()],
            cookies: Vec::new(),
            environment: DEFAULT_ENVIRONMENT.to_string(),
            backtrace_limit: 0,
            proxy_url: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }

    /// Create configuration from `ELASTIC_APM_*` environment variables
    pub fn from_env() -> Result<Self, AgentError> {
        let app_name = env::var("ELASTIC_APM_APP_NAME").map_err(|_| AgentError::MissingAppName)?;
        let mut config = Config::new(app_name);

        if let Ok(app_version) = env::var("ELASTIC_APM_APP_VERSION") {
            config.app_version = app_version;
        }
        if let Ok(server_url) = env::var("ELASTIC_APM_SERVER_URL") {
            config.server_url = server_url.trim_end_matches('/').to_string();
        }
        config.secret_token = env::var("ELASTIC_APM_SECRET_TOKEN").ok();
        if let Ok(hostname) = env::var("ELASTIC_APM_HOSTNAME") {
            config.hostname = hostname;
        }
        config.active = env::var("ELASTIC_APM_ACTIVE")
            .map(|val| val.to_lowercase() != "false")
            .unwrap_or(true);
        if let Ok(timeout) = env::var("ELASTIC_APM_TIMEOUT") {
            let secs = timeout.parse::<u64>().map_err(|_| {
                AgentError::InvalidConfig(format!("ELASTIC_APM_TIMEOUT is not a number: {timeout}"))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Ok(names) = env::var("ELASTIC_APM_ENV") {
            config.env = split_list(&names);
        }
        if let Ok(names) = env::var("ELASTIC_APM_COOKIES") {
            config.cookies = split_list(&names);
        }
        if let Ok(environment) = env::var("ELASTIC_APM_ENVIRONMENT") {
            config.environment = environment;
        }
        if let Ok(limit) = env::var("ELASTIC_APM_BACKTRACE_LIMIT") {
            config.backtrace_limit = limit.parse::<usize>().map_err(|_| {
                AgentError::InvalidConfig(format!(
                    "ELASTIC_APM_BACKTRACE_LIMIT is not a number: {limit}"
                ))
            })?;
        }
        config.proxy_url = env::var("ELASTIC_APM_PROXY_HTTPS")
            .or_else(|_| env::var("HTTPS_PROXY"))
            .ok();
        config.log_level = env::var("ELASTIC_APM_LOG_LEVEL")
            .map(|val| val.to_lowercase())
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string());

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.app_name.trim().is_empty() {
            return Err(AgentError::MissingAppName);
        }

        if let Err(e) = reqwest::Url::parse(&self.server_url) {
            return Err(AgentError::InvalidConfig(format!(
                "Invalid server url '{}': {e}",
                self.server_url
            )));
        }

        if self.timeout.is_zero() {
            return Err(AgentError::InvalidConfig(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        logger::env_filter(&self.log_level)?;

        Ok(())
    }

    /// URL of the event intake endpoint
    pub fn intake_url(&self) -> String {
        format!("{}/intake/v2/events", self.server_url.trim_end_matches('/'))
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
