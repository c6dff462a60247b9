// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! First pipeline stage: turns runtime events into [`RawEvent`]s.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::mpsc::Sender;
use tracing::{debug, error, warn};

use crate::constants::{REMOVED_STATUS, RESUBSCRIBE_DELAY};
use crate::event::{ContainerMetadata, RawEvent, SourceEvent};
use crate::source::{EventSource, EventStream};

pub struct Enricher<S> {
    source: Arc<S>,
    tx: Sender<RawEvent>,
    resubscribe_delay: Duration,
    last_seen: Option<i64>,
}

impl<S: EventSource> Enricher<S> {
    #[must_use]
    pub fn new(source: Arc<S>, tx: Sender<RawEvent>) -> Self {
        Self {
            source,
            tx,
            resubscribe_delay: RESUBSCRIBE_DELAY,
            last_seen: None,
        }
    }

    #[must_use]
    pub fn with_resubscribe_delay(mut self, delay: Duration) -> Self {
        self.resubscribe_delay = delay;
        self
    }

    /// Consumes runtime events until the downstream queue goes away.
    ///
    /// A broken subscription is re-established after a delay, asking the
    /// runtime to replay from the last event seen. Events sharing that
    /// second may be delivered twice.
    pub async fn run(mut self) {
        loop {
            match self.source.subscribe(self.last_seen).await {
                Ok(stream) => {
                    if !self.forward(stream).await {
                        return;
                    }
                }
                Err(e) => error!("Can't subscribe to container events: {}", e),
            }
            warn!(
                "Container event stream ended, resubscribing in {:?}",
                self.resubscribe_delay
            );
            tokio::time::sleep(self.resubscribe_delay).await;
        }
    }

    /// Returns false once the downstream queue is closed.
    async fn forward(&mut self, mut stream: EventStream) -> bool {
        while let Some(item) = stream.next().await {
            let event = match item {
                Ok(event) => event,
                Err(e) => {
                    error!("Error reading container events: {}", e);
                    break;
                }
            };
            self.last_seen = Some(event.time);
            let raw = self.enrich(event).await;
            debug!("Enriched event {:?}", raw);
            if self.tx.send(raw).await.is_err() {
                error!("Event queue closed, stopping enricher");
                return false;
            }
        }
        true
    }

    /// Attaches container metadata to `event`. Lookup failures are logged
    /// and the event goes on without metadata.
    pub async fn enrich(&self, event: SourceEvent) -> RawEvent {
        let SourceEvent {
            time,
            container_id,
            status,
            image,
        } = event;

        let metadata = if status == REMOVED_STATUS {
            None
        } else {
            match self.source.inspect(&container_id).await {
                Ok(metadata) => Some(metadata),
                Err(e) => {
                    error!("Error inspecting container {}: {}", container_id, e);
                    None
                }
            }
        };

        let name = metadata
            .as_ref()
            .map(ContainerMetadata::name)
            .map(display_name)
            .filter(|name| !name.is_empty())
            .unwrap_or(&container_id)
            .to_string();

        RawEvent {
            time,
            container_id,
            status,
            image,
            name,
            metadata,
        }
    }
}

/// `/web1` -> `web1`
fn display_name(name: &str) -> &str {
    name.strip_prefix('/').unwrap_or(name)
}
