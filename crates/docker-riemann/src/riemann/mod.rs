// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! [`Sink`] for a Riemann server, over TCP or UDP.
//!
//! Over TCP every message is prefixed with its length as a 4 byte big
//! endian integer and the server answers each one. Over UDP a message is a
//! single datagram and nothing comes back.

pub mod proto;

use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use prost::Message;
use tokio::net::{lookup_host, TcpStream, UdpSocket};
use tokio::time::timeout;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::address::Address;
use crate::constants::SEND_TIMEOUT;
use crate::errors::{AddressError, SinkError};
use crate::record::Record;
use crate::sink::Sink;
use proto::Msg;

#[derive(Debug, Clone)]
pub struct RiemannClient {
    timeout: Duration,
}

impl Default for RiemannClient {
    fn default() -> Self {
        Self {
            timeout: SEND_TIMEOUT,
        }
    }
}

impl RiemannClient {
    /// `timeout` bounds connecting and waiting for an acknowledgement.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

pub enum RiemannConnection {
    Tcp(Framed<TcpStream, LengthDelimitedCodec>),
    Udp(UdpSocket),
}

#[async_trait]
impl Sink for RiemannClient {
    type Connection = RiemannConnection;

    async fn connect(&self, address: &str) -> Result<RiemannConnection, SinkError> {
        match Address::parse(address)? {
            Address::Tcp(location) => {
                let stream = timeout(self.timeout, TcpStream::connect(&location))
                    .await
                    .map_err(|_| SinkError::Timeout)?
                    .map_err(SinkError::Connect)?;
                stream.set_nodelay(true)?;
                Ok(RiemannConnection::Tcp(Framed::new(
                    stream,
                    LengthDelimitedCodec::new(),
                )))
            }
            Address::Udp(location) => {
                let target = resolve(&location).await?;
                let local: SocketAddr = if target.is_ipv4() {
                    (Ipv4Addr::UNSPECIFIED, 0).into()
                } else {
                    (Ipv6Addr::UNSPECIFIED, 0).into()
                };
                let socket = UdpSocket::bind(local).await.map_err(SinkError::Connect)?;
                socket.connect(target).await.map_err(SinkError::Connect)?;
                Ok(RiemannConnection::Udp(socket))
            }
            Address::Unix(_) => Err(AddressError::UnsupportedScheme {
                scheme: "unix".to_string(),
                address: address.to_string(),
            }
            .into()),
        }
    }

    async fn send(
        &self,
        connection: &mut RiemannConnection,
        record: &Record,
    ) -> Result<(), SinkError> {
        let payload = Bytes::from(Msg::with_event(record).encode_to_vec());
        match connection {
            RiemannConnection::Tcp(framed) => timeout(self.timeout, exchange(framed, payload))
                .await
                .map_err(|_| SinkError::Timeout)?,
            RiemannConnection::Udp(socket) => {
                socket.send(&payload).await?;
                Ok(())
            }
        }
    }
}

async fn resolve(location: &str) -> Result<SocketAddr, SinkError> {
    lookup_host(location)
        .await
        .map_err(SinkError::Connect)?
        .next()
        .ok_or_else(|| {
            SinkError::Connect(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no address found for {location}"),
            ))
        })
}

async fn exchange(
    framed: &mut Framed<TcpStream, LengthDelimitedCodec>,
    payload: Bytes,
) -> Result<(), SinkError> {
    framed.send(payload).await?;
    let frame = framed.next().await.ok_or(SinkError::Closed)??;
    let response = Msg::decode(frame)?;
    if response.ok.unwrap_or(false) {
        Ok(())
    } else {
        Err(SinkError::Rejected(
            response
                .error
                .unwrap_or_else(|| "no reason given".to_string()),
        ))
    }
}
