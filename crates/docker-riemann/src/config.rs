// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Agent settings as supplied by the user, and the immutable configuration
//! compiled from them at startup.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::warn;

use crate::address::Address;
use crate::constants::{
    DEFAULT_DESCRIPTION, DEFAULT_DOCKER_HOST, DEFAULT_HEARTBEAT_DESCRIPTION,
    DEFAULT_HEARTBEAT_SERVICE, DEFAULT_HEARTBEAT_STATE, DEFAULT_RIEMANN_URL, DEFAULT_SERVICE,
    DEFAULT_STATE, DEFAULT_TTL,
};
use crate::errors::{AddressError, ConfigError};
use crate::record::Record;
use crate::template::{compile, Template};

/// Templates and fixed values for records built from container events.
#[derive(Debug, Clone, PartialEq)]
pub struct EventSettings {
    /// Host label attached to every record
    pub host: String,
    pub service: String,
    pub description: String,
    pub state: String,
    pub tags: Vec<String>,
    /// Ordered `(key, template)` pairs; a repeated key keeps the last value
    pub attributes: Vec<(String, String)>,
    pub metric: f64,
    /// Seconds the collector keeps an event; zero or less sends none
    pub ttl: f64,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            service: DEFAULT_SERVICE.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            state: DEFAULT_STATE.to_string(),
            tags: Vec::new(),
            attributes: Vec::new(),
            metric: 0.0,
            ttl: DEFAULT_TTL,
        }
    }
}

/// Fixed values for the periodic liveness record.
#[derive(Debug, Clone, PartialEq)]
pub struct HeartbeatSettings {
    /// An empty service disables the heartbeat
    pub service: String,
    pub description: String,
    pub state: String,
    pub tags: Vec<String>,
    pub attributes: Vec<(String, String)>,
    pub metric: f64,
    /// Seconds; the heartbeat fires every `ttl / 2`
    pub ttl: f64,
}

impl Default for HeartbeatSettings {
    fn default() -> Self {
        Self {
            service: DEFAULT_HEARTBEAT_SERVICE.to_string(),
            description: DEFAULT_HEARTBEAT_DESCRIPTION.to_string(),
            state: DEFAULT_HEARTBEAT_STATE.to_string(),
            tags: Vec::new(),
            attributes: Vec::new(),
            metric: 0.0,
            ttl: DEFAULT_TTL,
        }
    }
}

/// Everything the agent needs to start.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Collector address, `tcp://` or `udp://`
    pub riemann_url: String,
    /// Container runtime address, `unix://` or `tcp://`
    pub docker_host: String,
    pub event: EventSettings,
    pub heartbeat: HeartbeatSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            riemann_url: DEFAULT_RIEMANN_URL.to_string(),
            docker_host: DEFAULT_DOCKER_HOST.to_string(),
            event: EventSettings::default(),
            heartbeat: HeartbeatSettings::default(),
        }
    }
}

impl Settings {
    /// Checks everything that can be checked without compiling templates.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match Address::parse(&self.riemann_url)? {
            Address::Tcp(_) | Address::Udp(_) => {}
            Address::Unix(_) => return Err(unsupported("unix", &self.riemann_url)),
        }
        match Address::parse(&self.docker_host)? {
            Address::Unix(_) | Address::Tcp(_) => {}
            Address::Udp(_) => return Err(unsupported("udp", &self.docker_host)),
        }

        if self.event.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host cannot be empty".to_string()));
        }

        if !self.heartbeat.service.is_empty() {
            heartbeat_interval(self.heartbeat.ttl)?;
        }

        Ok(())
    }

    /// Validates the settings and compiles every template. Any failure here is
    /// fatal: the pipeline never starts with a broken configuration.
    pub fn compile(&self) -> Result<(EventConfig, Option<HeartbeatConfig>), ConfigError> {
        self.validate()?;
        let events = EventConfig::compile(&self.event)?;
        let heartbeat = HeartbeatConfig::new(&self.event.host, &self.heartbeat)?;
        Ok((events, heartbeat))
    }
}

/// Half the ttl, which must be representable and not round down to zero.
fn heartbeat_interval(ttl: f64) -> Result<Duration, ConfigError> {
    if !(ttl.is_finite() && ttl > 0.0) {
        return Err(ConfigError::HeartbeatTtl(ttl));
    }
    Duration::try_from_secs_f64(ttl / 2.0)
        .ok()
        .filter(|interval| !interval.is_zero())
        .ok_or(ConfigError::HeartbeatTtl(ttl))
}

fn unsupported(scheme: &str, address: &str) -> ConfigError {
    ConfigError::Address(AddressError::UnsupportedScheme {
        scheme: scheme.to_string(),
        address: address.to_string(),
    })
}

/// Parses a `key=value` attribute flag.
pub fn parse_attribute(pair: &str) -> Result<(String, String), ConfigError> {
    match pair.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(ConfigError::Attribute(pair.to_string())),
    }
}

fn compile_attributes(
    pairs: &[(String, String)],
) -> Result<BTreeMap<String, Template>, ConfigError> {
    let mut attributes = BTreeMap::new();
    for (key, value) in pairs {
        let template = compile(&format!("attribute '{key}'"), value)?;
        if attributes.insert(key.clone(), template).is_some() {
            warn!("attribute '{}' configured more than once, keeping the last value", key);
        }
    }
    Ok(attributes)
}

/// Compiled event templates, shared read-only by the transformer.
#[derive(Debug, Clone, PartialEq)]
pub struct EventConfig {
    pub host: String,
    pub service: Template,
    pub description: Template,
    pub state: Template,
    pub tags: Vec<Template>,
    pub attributes: BTreeMap<String, Template>,
    pub metric: f64,
    pub ttl: Option<f32>,
}

impl EventConfig {
    pub fn compile(settings: &EventSettings) -> Result<Self, ConfigError> {
        let tags = settings
            .tags
            .iter()
            .enumerate()
            .map(|(i, tag)| compile(&format!("tag {}", i + 1), tag))
            .collect::<Result<Vec<_>, _>>()?;

        let attributes = compile_attributes(&settings.attributes)?;

        #[allow(clippy::cast_possible_truncation)]
        let ttl = (settings.ttl > 0.0).then_some(settings.ttl as f32);

        Ok(EventConfig {
            host: settings.host.clone(),
            service: compile("service", &settings.service)?,
            description: compile("description", &settings.description)?,
            state: compile("state", &settings.state)?,
            tags,
            attributes,
            metric: settings.metric,
            ttl,
        })
    }
}

/// The liveness record and how often to send it.
#[derive(Debug, Clone, PartialEq)]
pub struct HeartbeatConfig {
    /// Everything but `time` is fixed for the life of the agent.
    pub record: Record,
    pub interval: Duration,
}

impl HeartbeatConfig {
    /// Returns `None` when the heartbeat is disabled by an empty service.
    pub fn new(host: &str, settings: &HeartbeatSettings) -> Result<Option<Self>, ConfigError> {
        if settings.service.is_empty() {
            return Ok(None);
        }
        let interval = heartbeat_interval(settings.ttl)?;

        let attributes = settings
            .attributes
            .iter()
            .cloned()
            .collect::<BTreeMap<String, String>>();

        #[allow(clippy::cast_possible_truncation)]
        let record = Record {
            host: host.to_string(),
            time: 0,
            service: settings.service.clone(),
            description: settings.description.clone(),
            state: settings.state.clone(),
            metric: settings.metric,
            tags: settings.tags.clone(),
            attributes,
            ttl: Some(settings.ttl as f32),
        };

        Ok(Some(HeartbeatConfig {
            record,
            interval,
        }))
    }
}
