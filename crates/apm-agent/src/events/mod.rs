// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Event model shipped to the intake.
//!
//! Every event carries an [`EventIdentity`]: its own id, the id of the trace
//! it belongs to, the id of its causal parent (if any) and its creation time.
//! Parenting copies the parent's trace id and records the parent's id, which
//! is how errors and spans are correlated with the transaction that was
//! active when they happened.
//!
//! # Wire format
//!
//! Each event renders as one JSON object keyed by its kind:
//!
//! ```text
//! {"metadata": {...}}
//! {"transaction": {...}}
//! {"span": {...}}
//! {"error": {...}}
//! {"metricset": {...}}
//! ```

pub mod error;
pub mod factory;
pub mod metadata;
pub mod metricset;
pub mod span;
pub mod stacktrace;
pub mod transaction;

use std::env;

use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::trace_context::TraceContext;

/// Generates a random 128-bit trace id as 32 hex digits.
pub(crate) fn generate_trace_id() -> String {
    format!("{:032x}", Uuid::new_v4().as_u128())
}

/// Generates a random 64-bit event id as 16 hex digits.
pub(crate) fn generate_event_id() -> String {
    format!("{:016x}", Uuid::new_v4().as_u128() as u64)
}

/// Current wall-clock time in microseconds since the epoch.
pub(crate) fn timestamp_micros() -> i64 {
    chrono::Utc::now().timestamp_micros()
}

/// Identity shared by all event kinds.
///
/// `id` and `trace_id` are generated once at construction. Only parenting
/// can replace the trace id, and only with the parent's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventIdentity {
    id: String,
    trace_id: String,
    parent_id: Option<String>,
    timestamp: i64,
}

impl Default for EventIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl EventIdentity {
    /// A root identity starting a new trace.
    pub fn new() -> Self {
        EventIdentity {
            id: generate_event_id(),
            trace_id: generate_trace_id(),
            parent_id: None,
            timestamp: timestamp_micros(),
        }
    }

    /// A fresh identity continuing the trace of `parent`.
    pub fn child_of(parent: &EventIdentity) -> Self {
        let mut identity = Self::new();
        identity.set_parent(parent);
        identity
    }

    pub fn set_parent(&mut self, parent: &EventIdentity) {
        self.trace_id = parent.trace_id.clone();
        self.parent_id = Some(parent.id.clone());
    }

    /// Continues a trace started by another service.
    pub fn set_trace_parent(&mut self, trace_parent: &TraceContext) {
        self.trace_id = trace_parent.trace_id().to_string();
        self.parent_id = Some(trace_parent.parent_id().to_string());
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

/// Anything that can be queued on the [`Connector`](crate::connector::Connector).
pub trait WireEvent {
    /// Renders the event as its single-key wire object.
    fn to_json(&self) -> Value;
}

/// Common capability of traceable events.
pub trait Event: WireEvent {
    fn identity(&self) -> &EventIdentity;

    fn identity_mut(&mut self) -> &mut EventIdentity;

    fn id(&self) -> &str {
        self.identity().id()
    }

    fn trace_id(&self) -> &str {
        self.identity().trace_id()
    }

    fn parent_id(&self) -> Option<&str> {
        self.identity().parent_id()
    }

    fn timestamp(&self) -> i64 {
        self.identity().timestamp()
    }

    /// Id of the transaction this event belongs to, if any.
    fn transaction_id(&self) -> Option<&str> {
        None
    }

    fn set_parent(&mut self, parent: &dyn Event) {
        let parent = parent.identity().clone();
        self.identity_mut().set_parent(&parent);
    }

    fn set_trace_parent(&mut self, trace_parent: &TraceContext) {
        self.identity_mut().set_trace_parent(trace_parent);
    }

    /// Trace context to propagate to downstream services, naming this event
    /// as their parent.
    fn trace_context(&self) -> TraceContext {
        TraceContext::for_event(self.trace_id(), self.id())
    }
}

/// Per-event context: user, custom and tag data plus the environment
/// variables and cookies to report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    pub user: Map<String, Value>,
    pub custom: Map<String, Value>,
    pub tags: Map<String, Value>,
    /// Names of environment variables to attach.
    pub env: Vec<String>,
    pub cookies: Map<String, Value>,
}

impl Context {
    /// Deep-merges `overrides` on top of `self`.
    ///
    /// Keys in `overrides` win; nested objects are merged key by key rather
    /// than replaced. Environment variable names are unioned.
    #[must_use]
    pub fn merged(&self, overrides: &Context) -> Context {
        let mut env = self.env.clone();
        for name in &overrides.env {
            if !env.contains(name) {
                env.push(name.clone());
            }
        }

        Context {
            user: merge_maps(&self.user, &overrides.user),
            custom: merge_maps(&self.custom, &overrides.custom),
            tags: merge_maps(&self.tags, &overrides.tags),
            env,
            cookies: merge_maps(&self.cookies, &overrides.cookies),
        }
    }

    /// Keeps only cookies whose name is in `allowed`.
    pub fn retain_cookies(&mut self, allowed: &[String]) {
        self.cookies.retain(|name, _| allowed.contains(name));
    }

    /// Wire form. Only environment variables set in this process are
    /// reported.
    pub fn to_json(&self) -> Value {
        let env: Map<String, Value> = self
            .env
            .iter()
            .filter_map(|name| env::var(name).ok().map(|value| (name.clone(), json!(value))))
            .collect();

        let mut context = json!({
            "user": self.user,
            "custom": self.custom,
            "tags": self.tags,
            "env": env,
        });
        if !self.cookies.is_empty() {
            context["request"] = json!({ "cookies": self.cookies });
        }
        context
    }
}

fn merge_maps(base: &Map<String, Value>, overrides: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = base.clone();
    for (key, value) in overrides {
        match merged.get_mut(key) {
            Some(existing) => merge_json(existing, value),
            None => {
                merged.insert(key.clone(), value.clone());
            }
        }
    }
    merged
}

/// Recursively merges `overrides` into `base`. Objects merge key by key;
/// any other value in `overrides` replaces the one in `base`.
pub fn merge_json(base: &mut Value, overrides: &Value) {
    match (base, overrides) {
        (Value::Object(base), Value::Object(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, overrides) => *base = overrides.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_generated_ids_are_fixed_width_hex() {
        let trace_id = generate_trace_id();
        let id = generate_event_id();

        assert_eq!(trace_id.len(), 32);
        assert_eq!(id.len(), 16);
        assert!(trace_id.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(generate_event_id(), id);
    }

    #[test]
    fn test_root_identity() {
        let identity = EventIdentity::new();
        assert_eq!(identity.parent_id(), None);
        assert!(identity.timestamp() <= timestamp_micros());
    }

    #[test]
    fn test_child_identity() {
        let parent = EventIdentity::new();
        let child = EventIdentity::child_of(&parent);

        assert_eq!(child.trace_id(), parent.trace_id());
        assert_eq!(child.parent_id(), Some(parent.id()));
        assert_ne!(child.id(), parent.id());
    }

    #[test]
    fn test_trace_parent_identity() {
        let header = "00-0bfda6be83a31fb66a455cbb74a70344-6b84fae6bd7064af-01";
        let trace_parent = TraceContext::create_from_header(header).unwrap();
        let mut identity = EventIdentity::new();
        identity.set_trace_parent(&trace_parent);

        assert_eq!(identity.trace_id(), "0bfda6be83a31fb66a455cbb74a70344");
        assert_eq!(identity.parent_id(), Some("6b84fae6bd7064af"));
    }

    #[test]
    fn test_merge_json_is_recursive() {
        let mut base = json!({"a": {"b": 1, "c": 2}, "d": [1, 2]});
        merge_json(&mut base, &json!({"a": {"c": 3, "e": 4}, "d": [9]}));
        assert_eq!(base, json!({"a": {"b": 1, "c": 3, "e": 4}, "d": [9]}));
    }

    #[test]
    fn test_context_merge() {
        let shared = Context {
            user: object(json!({"id": 1, "profile": {"name": "a", "plan": "free"}})),
            tags: object(json!({"region": "eu"})),
            env: vec!["SERVER_SOFTWARE".to_string()],
            ..Default::default()
        };
        let call = Context {
            user: object(json!({"profile": {"plan": "pro"}})),
            custom: object(json!({"route": "/"})),
            env: vec!["SERVER_SOFTWARE".to_string(), "PATH".to_string()],
            ..Default::default()
        };

        let merged = shared.merged(&call);
        assert_eq!(
            Value::Object(merged.user),
            json!({"id": 1, "profile": {"name": "a", "plan": "pro"}})
        );
        assert_eq!(Value::Object(merged.custom), json!({"route": "/"}));
        assert_eq!(Value::Object(merged.tags), json!({"region": "eu"}));
        assert_eq!(merged.env, vec!["SERVER_SOFTWARE", "PATH"]);
    }

    #[test]
    fn test_retain_cookies() {
        let mut context = Context {
            cookies: object(json!({"session": "abc", "tracking": "xyz"})),
            ..Default::default()
        };
        context.retain_cookies(&["session".to_string()]);
        assert_eq!(Value::Object(context.cookies), json!({"session": "abc"}));
    }

    #[test]
    #[serial]
    fn test_context_json_resolves_env() {
        env::set_var("APM_AGENT_TEST_SOFTWARE", "nginx");
        env::remove_var("APM_AGENT_TEST_UNSET");
        let context = Context {
            env: vec![
                "APM_AGENT_TEST_SOFTWARE".to_string(),
                "APM_AGENT_TEST_UNSET".to_string(),
            ],
            ..Default::default()
        };

        let json = context.to_json();
        assert_eq!(json["env"], json!({"APM_AGENT_TEST_SOFTWARE": "nginx"}));
        assert!(json.get("request").is_none());
        env::remove_var("APM_AGENT_TEST_SOFTWARE");
    }

    #[test]
    fn test_context_json_cookies() {
        let context = Context {
            cookies: object(json!({"session": "abc"})),
            ..Default::default()
        };
        assert_eq!(context.to_json()["request"]["cookies"]["session"], "abc");
    }
}
