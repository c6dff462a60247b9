// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory collaborators for exercising the pipeline stages.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use serde_json::Value;

use crate::errors::{SinkError, SourceError};
use crate::event::{ContainerMetadata, SourceEvent};
use crate::record::Record;
use crate::sink::Sink;
use crate::source::{EventSource, EventStream};

pub(crate) fn source_event(time: i64, id: &str, status: &str) -> SourceEvent {
    SourceEvent {
        time,
        container_id: id.to_string(),
        status: status.to_string(),
        image: "nginx:1.25".to_string(),
    }
}

/// Serves one scripted batch of events per subscription. Once the script is
/// exhausted, subscriptions stay open without producing anything.
#[derive(Default)]
pub(crate) struct FakeSource {
    batches: Mutex<VecDeque<Vec<Result<SourceEvent, SourceError>>>>,
    containers: HashMap<String, Value>,
    pub(crate) subscriptions: Mutex<Vec<Option<i64>>>,
    pub(crate) inspected: Mutex<Vec<String>>,
}

impl FakeSource {
    pub(crate) fn with_batch(self, batch: Vec<Result<SourceEvent, SourceError>>) -> Self {
        self.batches.lock().unwrap().push_back(batch);
        self
    }

    pub(crate) fn with_container(mut self, id: &str, metadata: Value) -> Self {
        self.containers.insert(id.to_string(), metadata);
        self
    }
}

#[async_trait]
impl EventSource for FakeSource {
    async fn subscribe(&self, since: Option<i64>) -> Result<EventStream, SourceError> {
        self.subscriptions.lock().unwrap().push(since);
        match self.batches.lock().unwrap().pop_front() {
            Some(batch) => Ok(stream::iter(batch).boxed()),
            None => Ok(stream::pending().boxed()),
        }
    }

    async fn inspect(&self, container_id: &str) -> Result<ContainerMetadata, SourceError> {
        self.inspected.lock().unwrap().push(container_id.to_string());
        self.containers
            .get(container_id)
            .cloned()
            .map(ContainerMetadata::new)
            .ok_or(SourceError::Closed)
    }
}

/// Records everything it is asked to deliver. Connection and send failures
/// can be scripted.
#[derive(Clone, Default)]
pub(crate) struct FakeSink {
    failing_connects: Arc<AtomicU32>,
    failing_sends: Arc<AtomicU32>,
    pub(crate) connects: Arc<AtomicU32>,
    pub(crate) delivered: Arc<Mutex<Vec<Record>>>,
}

impl FakeSink {
    pub(crate) fn failing_connects(self, count: u32) -> Self {
        self.failing_connects.store(count, Ordering::SeqCst);
        self
    }

    pub(crate) fn failing_sends(self, count: u32) -> Self {
        self.failing_sends.store(count, Ordering::SeqCst);
        self
    }

    pub(crate) fn delivered(&self) -> Vec<Record> {
        self.delivered.lock().unwrap().clone()
    }
}

fn take_failure(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl Sink for FakeSink {
    type Connection = u32;

    async fn connect(&self, _address: &str) -> Result<u32, SinkError> {
        let id = self.connects.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.failing_connects) {
            return Err(SinkError::Connect(io::Error::from(
                io::ErrorKind::ConnectionRefused,
            )));
        }
        Ok(id)
    }

    async fn send(&self, _connection: &mut u32, record: &Record) -> Result<(), SinkError> {
        if take_failure(&self.failing_sends) {
            return Err(SinkError::Closed);
        }
        self.delivered.lock().unwrap().push(record.clone());
        Ok(())
    }
}
