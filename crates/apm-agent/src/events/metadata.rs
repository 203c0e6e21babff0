// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Metadata event describing the reporting service, process and host.
//! Every committed batch starts with one.

use std::env;
use std::process;

use serde_json::{json, Value};

use crate::config::Config;
use crate::events::WireEvent;

pub const AGENT_NAME: &str = "apm-agent-rust";
pub const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    service_name: String,
    service_version: String,
    environment: String,
    pid: u32,
    argv: Vec<String>,
    hostname: String,
}

impl Metadata {
    pub fn new(config: &Config) -> Self {
        Metadata {
            service_name: config.app_name.clone(),
            service_version: config.app_version.clone(),
            environment: config.environment.clone(),
            pid: process::id(),
            argv: env::args().collect(),
            hostname: config.hostname.clone(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }
}

impl WireEvent for Metadata {
    fn to_json(&self) -> Value {
        json!({
            "metadata": {
                "service": {
                    "name": self.service_name,
                    "version": self.service_version,
                    "environment": self.environment,
                    "agent": {
                        "name": AGENT_NAME,
                        "version": AGENT_VERSION,
                    },
                    "language": {
                        "name": "rust",
                    },
                },
                "process": {
                    "pid": self.pid,
                    "argv": self.argv,
                },
                "system": {
                    "hostname": self.hostname,
                    "architecture": env::consts::ARCH,
                    "platform": env::consts::OS,
                },
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_wire_shape() {
        let config = Config {
            app_version: "1.4.2".to_string(),
            hostname: "web-1".to_string(),
            ..Config::new("checkout")
        };
        let json = Metadata::new(&config).to_json();
        let metadata = &json["metadata"];

        assert_eq!(metadata["service"]["name"], "checkout");
        assert_eq!(metadata["service"]["version"], "1.4.2");
        assert_eq!(metadata["service"]["environment"], "development");
        assert_eq!(metadata["service"]["agent"]["name"], AGENT_NAME);
        assert_eq!(metadata["service"]["language"]["name"], "rust");
        assert_eq!(metadata["process"]["pid"], process::id());
        assert!(metadata["process"]["argv"].is_array());
        assert_eq!(metadata["system"]["hostname"], "web-1");
        assert_eq!(metadata["system"]["platform"], env::consts::OS);
    }
}
