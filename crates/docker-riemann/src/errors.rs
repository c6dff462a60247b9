// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error types for the event pipeline and its collaborators.

use hyper::StatusCode;

/// A template could not be compiled. Always fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("bad value for {name} ({text}): {reason}")]
pub struct CompileError {
    pub name: String,
    pub text: String,
    pub reason: String,
}

/// A compiled template failed against a given event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct RenderError(pub String);

/// An address string such as `tcp://localhost:5555` could not be understood.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address '{0}' is missing a scheme (expected e.g. tcp://host:port)")]
    MissingScheme(String),
    #[error("unsupported scheme '{scheme}' in address '{address}'")]
    UnsupportedScheme { scheme: String, address: String },
    #[error("address '{0}' has an empty host or path")]
    Empty(String),
    #[error("address '{0}' is missing a port")]
    MissingPort(String),
    #[error("invalid address '{address}': {source}")]
    Invalid {
        address: String,
        #[source]
        source: url::ParseError,
    },
}

/// Startup configuration errors. The agent exits before the pipeline starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Template(#[from] CompileError),
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error("heartbeat ttl must be a positive number of seconds, got {0}")]
    HeartbeatTtl(f64),
    #[error("invalid attribute '{0}', expected key=value")]
    Attribute(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors raised by an [`crate::source::EventSource`].
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("can't connect to container runtime: {0}")]
    Connect(#[source] std::io::Error),
    #[error("http error talking to container runtime: {0}")]
    Http(#[from] hyper::Error),
    #[error("failed to build request: {0}")]
    Request(#[from] hyper::http::Error),
    #[error("container runtime answered {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("can't decode container runtime response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error("event subscription closed")]
    Closed,
}

/// Errors raised by a [`crate::sink::Sink`].
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("can't connect to riemann: {0}")]
    Connect(#[source] std::io::Error),
    #[error("i/o error talking to riemann: {0}")]
    Io(#[from] std::io::Error),
    #[error("riemann rejected the event: {0}")]
    Rejected(String),
    #[error("can't decode riemann response: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("timed out waiting for riemann")]
    Timeout,
    #[error("riemann closed the connection")]
    Closed,
    #[error(transparent)]
    Address(#[from] AddressError),
}

/// The sender stage gave up. Fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum SenderError {
    #[error("can't connect to riemann at {address} after {attempts} attempts: {last}")]
    ConnectExhausted {
        address: String,
        attempts: u32,
        #[source]
        last: SinkError,
    },
}

/// Reasons the pipeline stopped running.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Sender(#[from] SenderError),
    #[error("pipeline stage {stage} stopped unexpectedly")]
    StageStopped { stage: &'static str },
    #[error("pipeline stage panicked: {0}")]
    Join(#[from] tokio::task::JoinError),
}
