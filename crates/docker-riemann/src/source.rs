// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::errors::SourceError;
use crate::event::{ContainerMetadata, SourceEvent};

/// Lifecycle events as they arrive from the runtime. The stream is only
/// polled as fast as the pipeline accepts events.
pub type EventStream = BoxStream<'static, Result<SourceEvent, SourceError>>;

/// A container runtime that reports lifecycle events and can describe a
/// container on request.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Starts a subscription to lifecycle events. With `since` (epoch seconds)
    /// the runtime replays events from that time on.
    async fn subscribe(&self, since: Option<i64>) -> Result<EventStream, SourceError>;

    /// Looks up runtime metadata for a container. Failure is expected for
    /// containers that no longer exist.
    async fn inspect(&self, container_id: &str) -> Result<ContainerMetadata, SourceError>;
}
