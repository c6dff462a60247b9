// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Periodic liveness record, so the collector can tell the agent is up.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc::Sender;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::config::HeartbeatConfig;
use crate::record::Record;

/// Current time in epoch seconds.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

#[must_use]
pub fn system_clock() -> Clock {
    Arc::new(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| {
                i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX)
            })
    })
}

pub struct Heartbeat {
    config: HeartbeatConfig,
    tx: Sender<Record>,
    clock: Clock,
}

impl Heartbeat {
    #[must_use]
    pub fn new(config: HeartbeatConfig, tx: Sender<Record>) -> Self {
        Self {
            config,
            tx,
            clock: system_clock(),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Enqueues a record every interval, starting one interval after the
    /// call. Runs until the record queue closes.
    pub async fn run(self) {
        info!(
            "Sending heartbeat '{}' every {:?}",
            self.config.record.service, self.config.interval
        );
        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let record = self.beat();
            debug!("Heartbeat at {}", record.time);
            if self.tx.send(record).await.is_err() {
                error!("Record queue closed, stopping heartbeat");
                return;
            }
        }
    }

    fn beat(&self) -> Record {
        Record {
            time: (self.clock)(),
            ..self.config.record.clone()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::HeartbeatSettings;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn config() -> HeartbeatConfig {
        let settings = HeartbeatSettings {
            tags: vec!["agent".to_string()],
            ..HeartbeatSettings::default()
        };
        HeartbeatConfig::new("node-1", &settings).unwrap().unwrap()
    }

    fn stepping_clock(start: i64) -> Clock {
        let now = Arc::new(AtomicI64::new(start));
        Arc::new(move || now.fetch_add(30, Ordering::SeqCst))
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_every_half_ttl() {
        let (tx, mut rx) = mpsc::channel(8);
        let start = tokio::time::Instant::now();
        tokio::spawn(
            Heartbeat::new(config(), tx)
                .with_clock(stepping_clock(1_700_000_000))
                .run(),
        );

        let first = rx.recv().await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(30));
        let second = rx.recv().await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(60));

        assert_eq!(first.time, 1_700_000_000);
        assert_eq!(second.time, 1_700_000_030);
        assert_eq!(first.service, "riemann-docker-agent");
        assert_eq!(first.description, "docker-agent is alive");
        assert_eq!(first.state, "ok");
        assert_eq!(first.host, "node-1");
        assert_eq!(first.tags, ["agent"]);
        assert_eq!(first.ttl, Some(60.0));
        assert_eq!(Record { time: 0, ..first }, Record { time: 0, ..second });
    }

    #[tokio::test(start_paused = true)]
    async fn test_nothing_before_first_interval() {
        let (tx, mut rx) = mpsc::channel(8);
        tokio::spawn(Heartbeat::new(config(), tx).run());

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_queue_closes() {
        let (tx, rx) = mpsc::channel(8);
        drop(rx);
        Heartbeat::new(config(), tx).run().await;
    }

    #[test]
    fn test_system_clock_is_epoch_seconds() {
        assert!(system_clock()() > 1_600_000_000);
    }
}
