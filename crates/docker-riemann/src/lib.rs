// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Forwards container lifecycle events to a Riemann server, alongside a
//! periodic heartbeat.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod address;
pub mod config;
pub mod constants;
pub mod docker;
pub mod enricher;
pub mod errors;
pub mod event;
pub mod heartbeat;
pub mod pipeline;
pub mod record;
pub mod riemann;
pub mod sender;
pub mod sink;
pub mod source;
pub mod template;
pub mod transformer;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod testing;
