// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;

use crate::errors::SinkError;
use crate::record::Record;

/// A telemetry collector that accepts [`Record`]s over a connection.
#[async_trait]
pub trait Sink: Send + Sync {
    type Connection: Send + 'static;

    async fn connect(&self, address: &str) -> Result<Self::Connection, SinkError>;

    /// Delivers one record. After an error the connection must be considered
    /// unusable.
    async fn send(&self, connection: &mut Self::Connection, record: &Record)
        -> Result<(), SinkError>;
}
