// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Hostname detection

use std::env;
use tracing::warn;

/// Get the system hostname
///
/// Tried in order:
/// 1. ELASTIC_APM_HOSTNAME environment variable
/// 2. HOSTNAME environment variable
/// 3. System hostname (unix only)
/// 4. "unknown"
#[must_use]
pub fn get_hostname() -> String {
    for key in ["ELASTIC_APM_HOSTNAME", "HOSTNAME"] {
        if let Ok(hostname) = env::var(key) {
            if !hostname.is_empty() {
                return hostname;
            }
        }
    }

    if let Some(hostname) = system_hostname() {
        return hostname;
    }

    warn!("Could not determine hostname, using 'unknown'");
    "unknown".to_string()
}

#[cfg(unix)]
fn system_hostname() -> Option<String> {
    match nix::unistd::gethostname() {
        Ok(hostname) => hostname
            .to_str()
            .filter(|hostname| !hostname.is_empty())
            .map(str::to_string),
        Err(e) => {
            warn!("Failed to get system hostname: {}", e);
            None
        }
    }
}

#[cfg(not(unix))]
fn system_hostname() -> Option<String> {
    env::var("COMPUTERNAME").ok().filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_get_hostname_not_empty() {
        let hostname = get_hostname();
        assert!(!hostname.is_empty());
    }

    #[test]
    #[serial]
    fn test_hostname_override() {
        env::set_var("ELASTIC_APM_HOSTNAME", "test-hostname-override");
        let hostname = get_hostname();
        assert_eq!(hostname, "test-hostname-override");
        env::remove_var("ELASTIC_APM_HOSTNAME");
    }
}
