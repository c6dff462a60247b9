// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

/// A fully rendered telemetry event, ready for the sink.
///
/// Never mutated once queued; a failed send re-queues the same value.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub host: String,
    /// Epoch seconds.
    pub time: i64,
    pub service: String,
    pub description: String,
    pub state: String,
    pub metric: f64,
    pub tags: Vec<String>,
    pub attributes: BTreeMap<String, String>,
    /// Seconds the collector should keep this event.
    pub ttl: Option<f32>,
}
