// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Metricset event: a batch of named samples sharing tags.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use crate::events::{timestamp_micros, WireEvent};

#[derive(Debug, Clone, PartialEq)]
pub struct Metricset {
    samples: BTreeMap<String, f64>,
    tags: BTreeMap<String, String>,
    timestamp: i64,
}

impl Metricset {
    pub fn new(samples: BTreeMap<String, f64>, tags: BTreeMap<String, String>) -> Self {
        Metricset {
            samples,
            tags,
            timestamp: timestamp_micros(),
        }
    }

    pub fn samples(&self) -> &BTreeMap<String, f64> {
        &self.samples
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }
}

impl WireEvent for Metricset {
    fn to_json(&self) -> Value {
        let samples: Map<String, Value> = self
            .samples
            .iter()
            .map(|(name, value)| (name.clone(), json!({ "value": value })))
            .collect();

        json!({
            "metricset": {
                "timestamp": self.timestamp,
                "tags": self.tags,
                "samples": samples,
            }
        })
    }
}
