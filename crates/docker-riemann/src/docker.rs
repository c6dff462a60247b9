// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! [`EventSource`] backed by the Docker Engine API.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, StreamExt};
use http_body_util::{BodyExt, Empty};
use hyper::body::Incoming;
use hyper::{header, Method, Request, Response};
use hyper_util::rt::TokioIo;
use serde::Deserialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, UnixStream};
use tracing::{debug, warn};

use crate::address::Address;
use crate::errors::{AddressError, SourceError};
use crate::event::{ContainerMetadata, SourceEvent};
use crate::source::{EventSource, EventStream};

/// `{"type":["container"]}`, url encoded.
const CONTAINER_EVENTS_FILTER: &str = "%7B%22type%22%3A%5B%22container%22%5D%7D";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Endpoint {
    Unix(PathBuf),
    Tcp(String),
}

/// Talks HTTP/1.1 to the Docker daemon, one connection per request.
#[derive(Debug, Clone)]
pub struct DockerClient {
    endpoint: Endpoint,
}

#[derive(Deserialize)]
struct Version {
    #[serde(rename = "Version")]
    version: String,
}

impl DockerClient {
    /// `docker_host` is `unix:///path/to/socket` or `tcp://host:port`.
    pub fn new(docker_host: &str) -> Result<Self, SourceError> {
        let endpoint = match Address::parse(docker_host)? {
            Address::Unix(path) => Endpoint::Unix(path),
            Address::Tcp(location) => Endpoint::Tcp(location),
            Address::Udp(_) => {
                return Err(AddressError::UnsupportedScheme {
                    scheme: "udp".to_string(),
                    address: docker_host.to_string(),
                }
                .into())
            }
        };
        Ok(Self { endpoint })
    }

    /// Daemon version; used at startup to check that the daemon is reachable.
    pub async fn version(&self) -> Result<String, SourceError> {
        let body = self.get("/version").await?;
        let version: Version = serde_json::from_slice(&body)?;
        Ok(version.version)
    }

    async fn get(&self, path: &str) -> Result<Bytes, SourceError> {
        let response = self.request(path).await?;
        Ok(response.into_body().collect().await?.to_bytes())
    }

    async fn request(&self, path: &str) -> Result<Response<Incoming>, SourceError> {
        let request = Request::builder()
            .method(Method::GET)
            .uri(path)
            .header(header::HOST, "docker")
            .body(Empty::<Bytes>::new())?;

        let response = match &self.endpoint {
            Endpoint::Unix(socket) => {
                let stream = UnixStream::connect(socket)
                    .await
                    .map_err(SourceError::Connect)?;
                send_request(stream, request).await?
            }
            Endpoint::Tcp(location) => {
                let stream = TcpStream::connect(location)
                    .await
                    .map_err(SourceError::Connect)?;
                send_request(stream, request).await?
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.into_body().collect().await?.to_bytes();
            return Err(SourceError::Status {
                status,
                body: String::from_utf8_lossy(&body).trim().to_string(),
            });
        }
        Ok(response)
    }
}

async fn send_request<T>(
    stream: T,
    request: Request<Empty<Bytes>>,
) -> Result<Response<Incoming>, hyper::Error>
where
    T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let (mut sender, connection) =
        hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            debug!("Docker connection closed: {}", e);
        }
    });
    sender.send_request(request).await
}

#[async_trait]
impl EventSource for DockerClient {
    async fn subscribe(&self, since: Option<i64>) -> Result<EventStream, SourceError> {
        let mut path = format!("/events?filters={CONTAINER_EVENTS_FILTER}");
        if let Some(since) = since {
            path.push_str(&format!("&since={since}"));
        }
        let response = self.request(&path).await?;

        let lines = EventLines {
            body: response.into_body(),
            buffer: BytesMut::new(),
            done: false,
        };
        Ok(stream::unfold(lines, |mut lines| async move {
            lines.next_event().await.map(|event| (event, lines))
        })
        .boxed())
    }

    async fn inspect(&self, container_id: &str) -> Result<ContainerMetadata, SourceError> {
        let body = self.get(&format!("/containers/{container_id}/json")).await?;
        Ok(ContainerMetadata::new(serde_json::from_slice(&body)?))
    }
}

/// Splits the streamed `/events` body into one JSON document per line.
struct EventLines {
    body: Incoming,
    buffer: BytesMut,
    done: bool,
}

impl EventLines {
    async fn next_event(&mut self) -> Option<Result<SourceEvent, SourceError>> {
        loop {
            if let Some(end) = self.buffer.iter().position(|&b| b == b'\n') {
                let line = self.buffer.split_to(end + 1);
                match parse_event(&line[..end]) {
                    Ok(Some(event)) => return Some(Ok(event)),
                    Ok(None) => {}
                    Err(e) => warn!("Skipping undecodable container event: {}", e),
                }
                continue;
            }

            if self.done {
                if self.buffer.is_empty() {
                    return None;
                }
                // unterminated last line
                self.buffer.extend_from_slice(b"\n");
                continue;
            }

            match self.body.frame().await {
                Some(Ok(frame)) => {
                    if let Ok(data) = frame.into_data() {
                        self.buffer.extend_from_slice(&data);
                    }
                }
                Some(Err(e)) => {
                    self.done = true;
                    self.buffer.clear();
                    return Some(Err(e.into()));
                }
                None => self.done = true,
            }
        }
    }
}

#[derive(Deserialize)]
struct DockerEvent {
    status: Option<String>,
    id: Option<String>,
    from: Option<String>,
    #[serde(rename = "Type")]
    kind: Option<String>,
    #[serde(rename = "Action")]
    action: Option<String>,
    #[serde(rename = "Actor", default)]
    actor: Actor,
    time: Option<i64>,
}

#[derive(Deserialize, Default)]
struct Actor {
    #[serde(rename = "ID")]
    id: Option<String>,
    #[serde(rename = "Attributes", default)]
    attributes: HashMap<String, String>,
}

/// Decodes one event line. Blank lines and events that are not about a
/// container yield `None`.
///
/// Older daemons only send `status`, `id` and `from`; newer ones may only
/// send `Action` and `Actor`.
fn parse_event(line: &[u8]) -> Result<Option<SourceEvent>, serde_json::Error> {
    if line.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let event: DockerEvent = serde_json::from_slice(line)?;
    if event.kind.as_deref().is_some_and(|kind| kind != "container") {
        return Ok(None);
    }

    let mut actor = event.actor;
    let Some(container_id) = event.id.or(actor.id) else {
        return Ok(None);
    };
    let Some(status) = event.status.or(event.action) else {
        return Ok(None);
    };
    let image = event
        .from
        .or_else(|| actor.attributes.remove("image"))
        .unwrap_or_default();

    Ok(Some(SourceEvent {
        time: event.time.unwrap_or_default(),
        container_id,
        status,
        image,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_legacy_event() {
        let line = br#"{"status":"start","id":"abc123","from":"nginx:1.25","time":1700000000}"#;
        assert_eq!(
            parse_event(line).unwrap(),
            Some(SourceEvent {
                time: 1_700_000_000,
                container_id: "abc123".to_string(),
                status: "start".to_string(),
                image: "nginx:1.25".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_actor_event() {
        let line = br#"{"Type":"container","Action":"die","Actor":{"ID":"abc123","Attributes":{"image":"redis:7","name":"cache"}},"time":1700000005,"timeNano":1700000005000000000}"#;
        let event = parse_event(line).unwrap().unwrap();
        assert_eq!(event.container_id, "abc123");
        assert_eq!(event.status, "die");
        assert_eq!(event.image, "redis:7");
        assert_eq!(event.time, 1_700_000_005);
    }

    #[test]
    fn test_parse_skips_other_objects() {
        let line = br#"{"Type":"network","Action":"connect","Actor":{"ID":"net1"},"time":1}"#;
        assert_eq!(parse_event(line).unwrap(), None);
        assert_eq!(parse_event(b"  ").unwrap(), None);
        assert_eq!(parse_event(br#"{"time":1}"#).unwrap(), None);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_event(b"{not json").is_err());
    }

    #[test]
    fn test_new_rejects_udp() {
        assert!(matches!(
            DockerClient::new("udp://localhost:2375"),
            Err(SourceError::Address(AddressError::UnsupportedScheme { .. }))
        ));
        assert_eq!(
            DockerClient::new("tcp://localhost:2375/").unwrap().endpoint,
            Endpoint::Tcp("localhost:2375".to_string())
        );
    }
}
