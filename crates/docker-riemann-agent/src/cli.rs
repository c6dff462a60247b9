// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Command line flags.

use clap::{ArgAction, Parser};

use docker_riemann::config::{parse_attribute, EventSettings, HeartbeatSettings, Settings};
use docker_riemann::constants::{
    DEFAULT_DESCRIPTION, DEFAULT_DOCKER_HOST, DEFAULT_HEARTBEAT_DESCRIPTION,
    DEFAULT_HEARTBEAT_SERVICE, DEFAULT_HEARTBEAT_STATE, DEFAULT_RIEMANN_URL, DEFAULT_SERVICE,
    DEFAULT_STATE, DEFAULT_TTL,
};

/// Forwards Docker container lifecycle events to Riemann.
///
/// Service, description, state, tags and attribute values are templates,
/// e.g. `docker {{.Name}} {{.Status}}`. They can read `.Host`, `.Time`,
/// `.ContainerId`, `.Status`, `.Image`, `.Name` and the inspected container
/// under `.ContainerInfo`.
#[derive(Parser, Debug)]
#[command(name = "docker-riemann-agent", version, disable_help_flag = true)]
pub struct Args {
    /// Print help
    #[arg(long, action = ArgAction::Help)]
    #[allow(dead_code)]
    help: Option<bool>,

    /// Riemann server address, tcp:// or udp://
    #[arg(long, default_value = DEFAULT_RIEMANN_URL)]
    pub riemann_url: String,

    /// Docker daemon address, unix:// or tcp://
    #[arg(long, env = "DOCKER_HOST", default_value = DEFAULT_DOCKER_HOST)]
    pub docker_host: String,

    /// Log every event and record
    #[arg(short, long)]
    pub verbose: bool,

    /// Host reported in every event [default: this machine's hostname]
    #[arg(short = 'h', long)]
    pub host: Option<String>,

    #[arg(short, long, default_value = DEFAULT_SERVICE)]
    pub service: String,

    /// Seconds Riemann keeps an event; 0 sends none
    #[arg(long, default_value_t = DEFAULT_TTL)]
    pub ttl: f64,

    #[arg(short, long, default_value = DEFAULT_DESCRIPTION)]
    pub description: String,

    /// Repeatable
    #[arg(short = 't', long = "tag")]
    pub tags: Vec<String>,

    #[arg(long, default_value = DEFAULT_STATE)]
    pub state: String,

    #[arg(short, long, default_value_t = 0.0)]
    pub metric: f64,

    /// key=value, repeatable
    #[arg(short = 'a', long = "attribute", value_parser = parse_attribute)]
    pub attributes: Vec<(String, String)>,

    /// Heartbeat service; empty disables the heartbeat
    #[arg(long, default_value = DEFAULT_HEARTBEAT_SERVICE)]
    pub hb_service: String,

    /// Heartbeat ttl in seconds; a heartbeat is sent every ttl/2
    #[arg(long, default_value_t = DEFAULT_TTL)]
    pub hb_ttl: f64,

    #[arg(long, default_value = DEFAULT_HEARTBEAT_DESCRIPTION)]
    pub hb_description: String,

    #[arg(long = "hb-tag")]
    pub hb_tags: Vec<String>,

    #[arg(long, default_value = DEFAULT_HEARTBEAT_STATE)]
    pub hb_state: String,

    #[arg(long, default_value_t = 0.0)]
    pub hb_metric: f64,

    #[arg(long = "hb-attribute", value_parser = parse_attribute)]
    pub hb_attributes: Vec<(String, String)>,
}

impl Args {
    /// `default_host` is used unless `--host` was given.
    pub fn into_settings(self, default_host: impl FnOnce() -> String) -> Settings {
        Settings {
            riemann_url: self.riemann_url,
            docker_host: self.docker_host,
            event: EventSettings {
                host: self.host.unwrap_or_else(default_host),
                service: self.service,
                description: self.description,
                state: self.state,
                tags: self.tags,
                attributes: self.attributes,
                metric: self.metric,
                ttl: self.ttl,
            },
            heartbeat: HeartbeatSettings {
                service: self.hb_service,
                description: self.hb_description,
                state: self.hb_state,
                tags: self.hb_tags,
                attributes: self.hb_attributes,
                metric: self.hb_metric,
                ttl: self.hb_ttl,
            },
        }
    }

    #[must_use]
    pub fn log_level(&self, from_env: Option<String>) -> String {
        match from_env {
            Some(level) if !level.is_empty() => level.to_lowercase(),
            _ if self.verbose => "debug".to_string(),
            _ => "info".to_string(),
        }
    }
}
