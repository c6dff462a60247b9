// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

/// Capacity of each queue between pipeline stages.
pub const QUEUE_CAPACITY: usize = 10_000;

/// Status the runtime reports once a container is gone; it can no longer be
/// inspected.
pub const REMOVED_STATUS: &str = "destroy";

/// Connection attempts before the sender gives up on the collector.
pub const MAX_CONNECT_ATTEMPTS: u32 = 10;

/// First backoff delay between connection attempts; doubles on every attempt.
pub const CONNECT_BACKOFF_BASE: Duration = Duration::from_secs(1);

/// How long to wait for the collector to acknowledge an event.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Delay before re-subscribing to runtime events after the stream broke.
pub const RESUBSCRIBE_DELAY: Duration = Duration::from_secs(5);

pub const DEFAULT_RIEMANN_URL: &str = "tcp://localhost:5555";
pub const DEFAULT_DOCKER_HOST: &str = "unix:///var/run/docker.sock";
pub const DEFAULT_SERVICE: &str = "docker {{.Name}} {{.Status}}";
pub const DEFAULT_DESCRIPTION: &str = "container {{.Name}} {{.Status}}";
pub const DEFAULT_STATE: &str = "{{.Status}}";
pub const DEFAULT_TTL: f64 = 60.0;
pub const DEFAULT_HEARTBEAT_SERVICE: &str = "riemann-docker-agent";
pub const DEFAULT_HEARTBEAT_DESCRIPTION: &str = "docker-agent is alive";
pub const DEFAULT_HEARTBEAT_STATE: &str = "ok";
