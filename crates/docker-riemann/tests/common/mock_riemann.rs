// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Riemann TCP server that acknowledges every message

use bytes::Bytes;
use docker_riemann::riemann::proto::{Event, Msg};
use futures_util::{SinkExt, StreamExt};
use prost::Message;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

#[derive(Clone)]
pub struct MockRiemann {
    pub address: String,
    received: Arc<Mutex<Vec<Event>>>,
}

impl MockRiemann {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock riemann");
        let address = format!("tcp://{}", listener.local_addr().unwrap());
        let received = Arc::new(Mutex::new(Vec::new()));

        let events = received.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let events = events.clone();
                tokio::spawn(async move {
                    let mut framed = Framed::new(stream, LengthDelimitedCodec::new());
                    while let Some(Ok(frame)) = framed.next().await {
                        let msg = Msg::decode(frame).unwrap();
                        events.lock().unwrap().extend(msg.events);
                        let ack = Msg {
                            ok: Some(true),
                            ..Default::default()
                        };
                        if framed.send(Bytes::from(ack.encode_to_vec())).await.is_err() {
                            break;
                        }
                    }
                });
            }
        });

        MockRiemann { address, received }
    }

    pub fn events(&self) -> Vec<Event> {
        self.received.lock().unwrap().clone()
    }
}
