// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Wires the stages together:
//!
//! ```text
//! EventSource -> Enricher -> [events] -> Transformer -> [records] -> Sender -> Sink
//!                                         Heartbeat --^       ^-- requeue
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::info;

use crate::config::{EventConfig, HeartbeatConfig};
use crate::constants::{QUEUE_CAPACITY, RESUBSCRIBE_DELAY};
use crate::enricher::Enricher;
use crate::errors::PipelineError;
use crate::heartbeat::{system_clock, Clock, Heartbeat};
use crate::sender::{RetryStrategy, Sender};
use crate::sink::Sink;
use crate::source::EventSource;
use crate::transformer::Transformer;

pub struct Pipeline<S, K> {
    source: Arc<S>,
    sink: K,
    sink_address: String,
    events: Arc<EventConfig>,
    heartbeat: Option<HeartbeatConfig>,
    retry: RetryStrategy,
    clock: Clock,
    queue_capacity: usize,
    resubscribe_delay: Duration,
}

impl<S, K> Pipeline<S, K>
where
    S: EventSource + 'static,
    K: Sink + 'static,
{
    #[must_use]
    pub fn new(
        source: Arc<S>,
        sink: K,
        sink_address: String,
        events: EventConfig,
        heartbeat: Option<HeartbeatConfig>,
    ) -> Self {
        Self {
            source,
            sink,
            sink_address,
            events: Arc::new(events),
            heartbeat,
            retry: RetryStrategy::default(),
            clock: system_clock(),
            queue_capacity: QUEUE_CAPACITY,
            resubscribe_delay: RESUBSCRIBE_DELAY,
        }
    }

    #[must_use]
    pub fn with_retry_strategy(mut self, retry: RetryStrategy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_resubscribe_delay(mut self, delay: Duration) -> Self {
        self.resubscribe_delay = delay;
        self
    }

    /// Runs every stage until one of them stops, then stops the others.
    ///
    /// Only the sender stops on its own, when the collector stays
    /// unreachable; its error is returned. Records still queued are lost.
    pub async fn run(self) -> Result<(), PipelineError> {
        let (event_tx, event_rx) = mpsc::channel(self.queue_capacity);
        let (record_tx, record_rx) = mpsc::channel(self.queue_capacity);
        let mut stages: JoinSet<Result<(), PipelineError>> = JoinSet::new();

        let sender = Sender::new(
            self.sink,
            self.sink_address,
            self.retry,
            record_rx,
            record_tx.clone(),
        );
        stages.spawn(async move {
            sender.run().await?;
            Err(PipelineError::StageStopped { stage: "sender" })
        });

        match self.heartbeat {
            Some(config) => {
                let heartbeat = Heartbeat::new(config, record_tx.clone()).with_clock(self.clock);
                stages.spawn(async move {
                    heartbeat.run().await;
                    Err(PipelineError::StageStopped { stage: "heartbeat" })
                });
            }
            None => info!("Heartbeat disabled"),
        }

        let transformer = Transformer::new(self.events, event_rx, record_tx);
        stages.spawn(async move {
            transformer.run().await;
            Err(PipelineError::StageStopped {
                stage: "transformer",
            })
        });

        let enricher =
            Enricher::new(self.source, event_tx).with_resubscribe_delay(self.resubscribe_delay);
        stages.spawn(async move {
            enricher.run().await;
            Err(PipelineError::StageStopped { stage: "enricher" })
        });

        // dropping `stages` aborts whatever is still running
        match stages.join_next().await {
            Some(Ok(result)) => result,
            Some(Err(e)) => Err(e.into()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::{EventSettings, HeartbeatSettings, Settings};
    use crate::constants::DEFAULT_HEARTBEAT_SERVICE;
    use crate::errors::SenderError;
    use crate::testing::{source_event, FakeSink, FakeSource};
    use serde_json::json;

    fn events() -> EventConfig {
        EventConfig::compile(&EventSettings {
            host: "node-1".to_string(),
            ..EventSettings::default()
        })
        .unwrap()
    }

    fn fixed_clock() -> Clock {
        Arc::new(|| 1_700_000_100)
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_flow_to_sink() {
        let source = FakeSource::default()
            .with_container("abc123", json!({"Name": "/web1"}))
            .with_batch(vec![
                Ok(source_event(1_700_000_000, "abc123", "create")),
                Ok(source_event(1_700_000_001, "abc123", "start")),
                Ok(source_event(1_700_000_002, "abc123", "destroy")),
            ]);
        let sink = FakeSink::default();
        let pipeline = Pipeline::new(
            Arc::new(source),
            sink.clone(),
            "tcp://riemann:5555".to_string(),
            events(),
            None,
        );
        let handle = tokio::spawn(pipeline.run());

        tokio::time::sleep(Duration::from_secs(1)).await;

        let services: Vec<_> = sink.delivered().into_iter().map(|r| r.service).collect();
        assert_eq!(
            services,
            [
                "docker web1 create",
                "docker web1 start",
                "docker abc123 destroy"
            ]
        );
        assert!(!handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_flows_to_sink() {
        let heartbeat = HeartbeatConfig::new(
            "node-1",
            &HeartbeatSettings {
                ttl: 10.0,
                ..HeartbeatSettings::default()
            },
        )
        .unwrap();
        let sink = FakeSink::default();
        let pipeline = Pipeline::new(
            Arc::new(FakeSource::default()),
            sink.clone(),
            "tcp://riemann:5555".to_string(),
            events(),
            heartbeat,
        )
        .with_clock(fixed_clock());
        tokio::spawn(pipeline.run());

        tokio::time::sleep(Duration::from_secs(11)).await;

        let delivered = sink.delivered();
        assert_eq!(delivered.len(), 2);
        assert!(delivered
            .iter()
            .all(|r| r.service == "riemann-docker-agent" && r.time == 1_700_000_100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_heartbeat_sends_nothing() {
        let settings = Settings {
            heartbeat: HeartbeatSettings {
                service: String::new(),
                ttl: 10.0,
                ..HeartbeatSettings::default()
            },
            ..Settings::default()
        };
        let (events, heartbeat) = settings.compile().unwrap();
        assert!(heartbeat.is_none());

        let source = FakeSource::default().with_batch(vec![Ok(source_event(1, "a", "start"))]);
        let sink = FakeSink::default();
        let pipeline = Pipeline::new(
            Arc::new(source),
            sink.clone(),
            settings.riemann_url.clone(),
            events,
            heartbeat,
        )
        .with_clock(fixed_clock());
        let handle = tokio::spawn(pipeline.run());

        // six times the ttl
        tokio::time::sleep(Duration::from_secs(60)).await;

        let delivered = sink.delivered();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].state, "start");
        assert!(delivered
            .iter()
            .all(|r| r.service != DEFAULT_HEARTBEAT_SERVICE && r.time != 1_700_000_100));
        assert!(!handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_sink_stops_pipeline() {
        let source = FakeSource::default().with_batch(vec![Ok(source_event(1, "a", "start"))]);
        let sink = FakeSink::default().failing_connects(u32::MAX);
        let pipeline = Pipeline::new(
            Arc::new(source),
            sink.clone(),
            "tcp://riemann:5555".to_string(),
            events(),
            None,
        );

        let error = pipeline.run().await.unwrap_err();

        assert!(matches!(
            error,
            PipelineError::Sender(SenderError::ConnectExhausted { attempts: 10, .. })
        ));
        assert!(sink.delivered().is_empty());
    }
}
