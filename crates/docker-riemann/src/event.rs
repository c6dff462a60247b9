// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Container lifecycle events, before and after enrichment.

use serde_json::{Map, Value};

/// A lifecycle event as emitted by the container runtime, before enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEvent {
    /// Epoch seconds.
    pub time: i64,
    pub container_id: String,
    pub status: String,
    pub image: String,
}

/// Result of inspecting a container, kept as the runtime returned it so that
/// templates can reach any field (`.ContainerInfo.Config.Labels`, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerMetadata(Value);

impl ContainerMetadata {
    #[must_use]
    pub fn new(value: Value) -> Self {
        ContainerMetadata(value)
    }

    /// The runtime's display name, e.g. `/web1`. Empty when absent.
    #[must_use]
    pub fn name(&self) -> &str {
        self.0.get("Name").and_then(Value::as_str).unwrap_or_default()
    }

    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

/// A normalized lifecycle event, ready to be rendered.
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    pub time: i64,
    pub container_id: String,
    pub status: String,
    pub image: String,
    /// Never empty: falls back to `container_id`.
    pub name: String,
    pub metadata: Option<ContainerMetadata>,
}

impl RawEvent {
    /// Builds the value templates are evaluated against.
    ///
    /// `host` is not part of the event itself; it is supplied by the
    /// configuration at render time.
    #[must_use]
    pub fn template_context(&self, host: &str) -> Value {
        let mut fields = Map::new();
        fields.insert("Host".to_string(), Value::from(host));
        fields.insert("Time".to_string(), Value::from(self.time));
        fields.insert(
            "ContainerId".to_string(),
            Value::from(self.container_id.as_str()),
        );
        fields.insert("Status".to_string(), Value::from(self.status.as_str()));
        fields.insert("Image".to_string(), Value::from(self.image.as_str()));
        fields.insert("Name".to_string(), Value::from(self.name.as_str()));
        fields.insert(
            "ContainerInfo".to_string(),
            self.metadata
                .as_ref()
                .map_or(Value::Null, |metadata| metadata.as_value().clone()),
        );
        Value::Object(fields)
    }
}
