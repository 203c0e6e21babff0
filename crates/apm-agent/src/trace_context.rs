// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! W3C `traceparent` header parsing and rendering.
//!
//! # Header Format
//!
//! ```text
//! traceparent: 00-0bfda6be83a31fb66a455cbb74a70344-6b84fae6bd7064af-01
//!              |  |                                |                |
//!              |  trace id (32 hex)                parent id (16)   flags (2)
//!              version (2 hex)
//! ```
//!
//! Parsing is strict: a header is either accepted whole or rejected. There is
//! no partial parse and no trailing vendor segment.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::AgentError;

/// HTTP header key carrying the trace context.
pub const TRACEPARENT_KEY: &str = "traceparent";

/// Version emitted for contexts created by this agent.
pub const DEFAULT_VERSION: &str = "00";

/// Flags emitted for contexts created by this agent (sampled).
pub const DEFAULT_FLAGS: &str = "01";

fn traceparent_regex() -> &'static Regex {
    static TRACEPARENT_REGEX: OnceLock<Regex> = OnceLock::new();
    TRACEPARENT_REGEX.get_or_init(|| {
        Regex::new(r"(?i)^([a-f0-9]{2})-([a-f0-9]{32})-([a-f0-9]{16})-([a-f0-9]{2})$")
            .expect("failed creating regex")
    })
}

/// Parsed `traceparent` header. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraceContext {
    version: String,
    trace_id: String,
    parent_id: String,
    flags: String,
}

impl TraceContext {
    /// Builds a context for an event this process owns, to be propagated
    /// downstream.
    pub(crate) fn for_event(trace_id: &str, id: &str) -> Self {
        TraceContext {
            version: DEFAULT_VERSION.to_string(),
            trace_id: trace_id.to_string(),
            parent_id: id.to_string(),
            flags: DEFAULT_FLAGS.to_string(),
        }
    }

    /// Returns true iff `header` has exactly four hyphen separated hex fields
    /// of widths 2, 32, 16 and 2.
    pub fn is_valid_header(header: &str) -> bool {
        traceparent_regex().is_match(header)
    }

    pub fn create_from_header(header: &str) -> Result<Self, AgentError> {
        let captures = traceparent_regex()
            .captures(header)
            .ok_or_else(|| AgentError::InvalidTraceContextHeader(header.to_string()))?;

        // all four groups are mandatory in the pattern
        let field = |i: usize| {
            captures
                .get(i)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        };

        Ok(TraceContext {
            version: field(1),
            trace_id: field(2),
            parent_id: field(3),
            flags: field(4),
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn parent_id(&self) -> &str {
        &self.parent_id
    }

    pub fn flags(&self) -> &str {
        &self.flags
    }

    /// Whether the sampled bit of the flags is set.
    pub fn is_sampled(&self) -> bool {
        u8::from_str_radix(&self.flags, 16).is_ok_and(|flags| flags & 0x01 == 0x01)
    }
}

impl FromStr for TraceContext {
    type Err = AgentError;

    fn from_str(header: &str) -> Result<Self, Self::Err> {
        Self::create_from_header(header)
    }
}

impl fmt::Display for TraceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}",
            self.version, self.trace_id, self.parent_id, self.flags
        )
    }
}
