// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Endpoint addresses of the form `scheme://location`.

use std::path::PathBuf;

use url::Url;

use crate::errors::AddressError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    /// `tcp://host:port`
    Tcp(String),
    /// `udp://host:port`
    Udp(String),
    /// `unix:///path/to/socket`
    Unix(PathBuf),
}

impl Address {
    pub fn parse(address: &str) -> Result<Self, AddressError> {
        let url = Url::parse(address).map_err(|source| AddressError::Invalid {
            address: address.to_string(),
            source,
        })?;
        // `localhost:5555` parses with `localhost` as its scheme
        if url.cannot_be_a_base() {
            return Err(AddressError::MissingScheme(address.to_string()));
        }

        match url.scheme() {
            "tcp" => Ok(Address::Tcp(host_and_port(&url, address)?)),
            "udp" => Ok(Address::Udp(host_and_port(&url, address)?)),
            "unix" => match url.path() {
                "" | "/" => Err(AddressError::Empty(address.to_string())),
                path => Ok(Address::Unix(PathBuf::from(path))),
            },
            scheme => Err(AddressError::UnsupportedScheme {
                scheme: scheme.to_string(),
                address: address.to_string(),
            }),
        }
    }
}

fn host_and_port(url: &Url, address: &str) -> Result<String, AddressError> {
    let host = url
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| AddressError::Empty(address.to_string()))?;
    let port = url
        .port()
        .ok_or_else(|| AddressError::MissingPort(address.to_string()))?;
    Ok(format!("{host}:{port}"))
}
