// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use tracing::warn;

/// Host label used when `--host` is not given.
///
/// Tries, in order, the `HOSTNAME` environment variable, the system
/// hostname, then falls back to `unknown`.
#[must_use]
pub fn get_hostname() -> String {
    if let Ok(hostname) = env::var("HOSTNAME") {
        if !hostname.is_empty() {
            return hostname;
        }
    }

    match nix::unistd::gethostname() {
        Ok(hostname) => match hostname.into_string() {
            Ok(hostname) if !hostname.is_empty() => return hostname,
            Ok(_) => {}
            Err(raw) => warn!("System hostname {:?} is not valid UTF-8", raw),
        },
        Err(e) => warn!("Failed to get system hostname: {}", e),
    }

    warn!("Could not determine hostname, using 'unknown'");
    "unknown".to_string()
}
