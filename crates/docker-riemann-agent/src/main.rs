// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

mod cli;
mod hostname;

use std::{env, process, sync::Arc};

use anyhow::Context;
use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use docker_riemann::{docker::DockerClient, pipeline::Pipeline, riemann::RiemannClient};

use crate::cli::Args;

#[tokio::main]
pub async fn main() {
    let args = Args::parse();

    let log_level = args.log_level(env::var("RIEMANN_DOCKER_LOG_LEVEL").ok());
    let env_filter = format!("h2=off,hyper=off,{}", log_level);

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(false)
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    if let Err(e) = run(args).await {
        error!("{:#}", e);
        process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let settings = args.into_settings(hostname::get_hostname);
    let (events, heartbeat) = settings.compile()?;

    let docker = DockerClient::new(&settings.docker_host)?;
    let version = docker
        .version()
        .await
        .with_context(|| format!("can't reach docker at {}", settings.docker_host))?;
    info!(
        "Forwarding events from docker {} at {} to riemann at {} as host {}",
        version, settings.docker_host, settings.riemann_url, events.host
    );

    Pipeline::new(
        Arc::new(docker),
        RiemannClient::default(),
        settings.riemann_url,
        events,
        heartbeat,
    )
    .run()
    .await?;
    Ok(())
}
