// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Minimal Docker Engine API: `/version`, `/events` and
//! `/containers/{id}/json`

use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use http_body_util::{combinators::UnsyncBoxBody, BodyExt, Full, StreamBody};
use hyper::body::{Frame, Incoming};
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::convert::Infallible;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, UnixListener};

type Body = UnsyncBoxBody<Bytes, Infallible>;

#[derive(Default)]
struct State {
    /// Lines written to every `/events` subscriber, which is then left open
    events: Vec<String>,
    containers: HashMap<String, Value>,
    /// Path and query of every request
    requests: Vec<String>,
}

#[derive(Clone, Default)]
pub struct MockDocker {
    state: Arc<Mutex<State>>,
}

impl MockDocker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_event(self, event: Value) -> Self {
        self.with_raw_event(&event.to_string())
    }

    pub fn with_raw_event(self, line: &str) -> Self {
        self.state.lock().unwrap().events.push(format!("{line}\n"));
        self
    }

    pub fn with_container(self, id: &str, metadata: Value) -> Self {
        self.state
            .lock()
            .unwrap()
            .containers
            .insert(id.to_string(), metadata);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Serves on a random local port and returns its `tcp://` address
    pub async fn start_tcp(&self) -> String {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock docker");
        let address = format!("tcp://{}", listener.local_addr().unwrap());
        let mock = self.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(mock.clone().serve(stream));
            }
        });
        address
    }

    /// Serves on a unix socket at `path` and returns its `unix://` address
    pub async fn start_unix(&self, path: &Path) -> String {
        let listener = UnixListener::bind(path).expect("Failed to bind mock docker socket");
        let mock = self.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(mock.clone().serve(stream));
            }
        });
        format!("unix://{}", path.display())
    }

    async fn serve<T>(self, stream: T)
    where
        T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let service = hyper::service::service_fn(move |req: Request<Incoming>| {
            let mock = self.clone();
            async move { Ok::<_, Infallible>(mock.respond(&req)) }
        });
        let _ = hyper::server::conn::http1::Builder::new()
            .serve_connection(TokioIo::new(stream), service)
            .await;
    }

    fn respond(&self, req: &Request<Incoming>) -> Response<Body> {
        let path = req.uri().path().to_string();
        let mut state = self.state.lock().unwrap();
        state.requests.push(
            req.uri()
                .path_and_query()
                .map(ToString::to_string)
                .unwrap_or_default(),
        );

        if path == "/version" {
            return json_response(StatusCode::OK, &json!({"Version": "24.0.7"}));
        }
        if path == "/events" {
            let lines = state.events.clone();
            let body = StreamBody::new(
                stream::iter(lines)
                    .map(|line| Ok::<_, Infallible>(Frame::data(Bytes::from(line))))
                    .chain(stream::pending()),
            );
            return Response::new(body.boxed_unsync());
        }
        if let Some(id) = path
            .strip_prefix("/containers/")
            .and_then(|rest| rest.strip_suffix("/json"))
        {
            return match state.containers.get(id) {
                Some(metadata) => json_response(StatusCode::OK, metadata),
                None => json_response(
                    StatusCode::NOT_FOUND,
                    &json!({"message": format!("No such container: {id}")}),
                ),
            };
        }
        json_response(StatusCode::NOT_FOUND, &json!({"message": "page not found"}))
    }
}

fn json_response(status: StatusCode, body: &Value) -> Response<Body> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())).boxed_unsync())
        .unwrap()
}
