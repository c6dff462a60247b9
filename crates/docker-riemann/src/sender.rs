// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Last pipeline stage: owns the collector connection and delivers records.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError, Receiver};
use tracing::{debug, error, info, warn};

use crate::constants::{CONNECT_BACKOFF_BASE, MAX_CONNECT_ATTEMPTS};
use crate::errors::{SenderError, SinkError};
use crate::record::Record;
use crate::sink::Sink;

/// How to retry connecting to the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStrategy {
    /// Retry `n` times in a row without waiting.
    Immediate(u32),
    /// `attempts` tries, waiting `base * 2^attempt` after each failure but
    /// the last.
    ExponentialBackoff { attempts: u32, base: Duration },
}

impl Default for RetryStrategy {
    fn default() -> Self {
        RetryStrategy::ExponentialBackoff {
            attempts: MAX_CONNECT_ATTEMPTS,
            base: CONNECT_BACKOFF_BASE,
        }
    }
}

impl RetryStrategy {
    #[must_use]
    pub fn attempts(&self) -> u32 {
        match self {
            RetryStrategy::Immediate(attempts)
            | RetryStrategy::ExponentialBackoff { attempts, .. } => (*attempts).max(1),
        }
    }

    /// Delay after the failed attempt number `attempt`, counted from 0.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            RetryStrategy::Immediate(_) => Duration::ZERO,
            RetryStrategy::ExponentialBackoff { base, .. } => {
                base.saturating_mul(2u32.checked_pow(attempt).unwrap_or(u32::MAX))
            }
        }
    }
}

pub struct Sender<K: Sink> {
    sink: K,
    address: String,
    retry: RetryStrategy,
    rx: Receiver<Record>,
    /// Tail of the queue `rx` reads from, for records that failed to send.
    requeue: mpsc::Sender<Record>,
    /// Failed records that did not fit in the queue.
    backlog: VecDeque<Record>,
    connection: Option<K::Connection>,
}

impl<K: Sink> Sender<K> {
    #[must_use]
    pub fn new(
        sink: K,
        address: String,
        retry: RetryStrategy,
        rx: Receiver<Record>,
        requeue: mpsc::Sender<Record>,
    ) -> Self {
        Self {
            sink,
            address,
            retry,
            rx,
            requeue,
            backlog: VecDeque::new(),
            connection: None,
        }
    }

    /// Delivers records until the collector stays unreachable for every
    /// connection attempt.
    ///
    /// A record that fails to send is put back at the tail of the queue and
    /// the connection is dropped, so delivery is at least once and records
    /// may reach the collector out of order.
    pub async fn run(mut self) -> Result<(), SenderError> {
        while let Some(record) = self.next_record().await {
            self.deliver(record).await?;
        }
        Ok(())
    }

    async fn next_record(&mut self) -> Option<Record> {
        while let Some(record) = self.backlog.pop_front() {
            if let Err(e) = self.requeue.try_send(record) {
                self.backlog.push_front(e.into_inner());
                break;
            }
        }
        if self.backlog.is_empty() {
            self.rx.recv().await
        } else {
            // the queue is full, so this only falls back when it was closed
            self.rx.try_recv().ok().or_else(|| self.backlog.pop_front())
        }
    }

    async fn deliver(&mut self, record: Record) -> Result<(), SenderError> {
        let mut connection = match self.connection.take() {
            Some(connection) => connection,
            None => self.connect().await?,
        };

        debug!("Sending {:?}", record);
        match self.sink.send(&mut connection, &record).await {
            Ok(()) => self.connection = Some(connection),
            Err(e) => {
                error!("Can't send event to riemann: {}", e);
                self.requeue(record);
            }
        }
        Ok(())
    }

    async fn connect(&mut self) -> Result<K::Connection, SenderError> {
        let attempts = self.retry.attempts();
        let mut last = SinkError::Closed;
        for attempt in 0..attempts {
            match self.sink.connect(&self.address).await {
                Ok(connection) => {
                    info!("Connected to riemann at {}", self.address);
                    return Ok(connection);
                }
                Err(e) => {
                    if attempt + 1 < attempts {
                        let delay = self.retry.delay(attempt);
                        error!("Can't connect to riemann: {} - waiting {:?}", e, delay);
                        tokio::time::sleep(delay).await;
                    } else {
                        error!("Can't connect to riemann: {}", e);
                    }
                    last = e;
                }
            }
        }
        Err(SenderError::ConnectExhausted {
            address: self.address.clone(),
            attempts,
            last,
        })
    }

    fn requeue(&mut self, record: Record) {
        match self.requeue.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(record) | TrySendError::Closed(record)) => {
                warn!("Record queue is full, holding failed record for retry");
                self.backlog.push_back(record);
            }
        }
    }
}
