// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Subset of the Riemann protocol buffers schema (`proto.proto`) used to
//! submit events.

use prost::Message;

use crate::record::Record;

#[derive(Clone, PartialEq, Message)]
pub struct Attribute {
    #[prost(string, required, tag = "1")]
    pub key: String,
    #[prost(string, optional, tag = "2")]
    pub value: Option<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Event {
    #[prost(int64, optional, tag = "1")]
    pub time: Option<i64>,
    #[prost(string, optional, tag = "2")]
    pub state: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub service: Option<String>,
    #[prost(string, optional, tag = "4")]
    pub host: Option<String>,
    #[prost(string, optional, tag = "5")]
    pub description: Option<String>,
    #[prost(string, repeated, tag = "7")]
    pub tags: Vec<String>,
    #[prost(float, optional, tag = "8")]
    pub ttl: Option<f32>,
    #[prost(message, repeated, tag = "9")]
    pub attributes: Vec<Attribute>,
    #[prost(int64, optional, tag = "10")]
    pub time_micros: Option<i64>,
    #[prost(sint64, optional, tag = "13")]
    pub metric_sint64: Option<i64>,
    #[prost(double, optional, tag = "14")]
    pub metric_d: Option<f64>,
    #[prost(float, optional, tag = "15")]
    pub metric_f: Option<f32>,
}

/// Envelope for both directions. Requests carry `events`; responses carry
/// `ok` and, on failure, `error`.
#[derive(Clone, PartialEq, Message)]
pub struct Msg {
    #[prost(bool, optional, tag = "2")]
    pub ok: Option<bool>,
    #[prost(string, optional, tag = "3")]
    pub error: Option<String>,
    #[prost(message, repeated, tag = "6")]
    pub events: Vec<Event>,
}

impl From<&Record> for Event {
    #[allow(clippy::cast_possible_truncation)]
    fn from(record: &Record) -> Self {
        Event {
            time: Some(record.time),
            state: Some(record.state.clone()),
            service: Some(record.service.clone()),
            host: Some(record.host.clone()),
            description: Some(record.description.clone()),
            tags: record.tags.clone(),
            ttl: record.ttl,
            attributes: record
                .attributes
                .iter()
                .map(|(key, value)| Attribute {
                    key: key.clone(),
                    value: Some(value.clone()),
                })
                .collect(),
            metric_d: Some(record.metric),
            metric_f: Some(record.metric as f32),
            ..Default::default()
        }
    }
}

impl Msg {
    #[must_use]
    pub fn with_event(record: &Record) -> Self {
        Msg {
            events: vec![Event::from(record)],
            ..Default::default()
        }
    }
}
