// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Renders [`RawEvent`]s into [`Record`]s with the configured templates.

use std::sync::Arc;

use tokio::sync::mpsc::{Receiver, Sender};
use tracing::{debug, error};

use crate::config::EventConfig;
use crate::event::RawEvent;
use crate::record::Record;

pub struct Transformer {
    config: Arc<EventConfig>,
    rx: Receiver<RawEvent>,
    tx: Sender<Record>,
}

impl Transformer {
    #[must_use]
    pub fn new(config: Arc<EventConfig>, rx: Receiver<RawEvent>, tx: Sender<Record>) -> Self {
        Self { config, rx, tx }
    }

    /// Runs until either queue closes.
    pub async fn run(mut self) {
        while let Some(event) = self.rx.recv().await {
            let record = transform(&self.config, &event);
            debug!("Rendered record {:?}", record);
            if self.tx.send(record).await.is_err() {
                error!("Record queue closed, stopping transformer");
                return;
            }
        }
    }
}

/// Renders one event. Templates that fail render as empty strings, so this
/// always yields a record.
#[must_use]
pub fn transform(config: &EventConfig, event: &RawEvent) -> Record {
    let context = event.template_context(&config.host);
    Record {
        host: config.host.clone(),
        time: event.time,
        service: config.service.render(&context),
        description: config.description.render(&context),
        state: config.state.render(&context),
        metric: config.metric,
        tags: config
            .tags
            .iter()
            .map(|tag| tag.render(&context))
            .collect(),
        attributes: config
            .attributes
            .iter()
            .map(|(key, value)| (key.clone(), value.render(&context)))
            .collect(),
        ttl: config.ttl,
    }
}
