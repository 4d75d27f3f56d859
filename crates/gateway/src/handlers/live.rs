//! Live update websocket
//!
//! Each socket is registered with the bus as an observer. Inbound frames are
//! read and discarded; the read loop only exists to notice the close.

use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use colonia_common::live::{LiveUpdateBus, Observer};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::AppState;

/// Write half of a websocket
struct SocketObserver {
    sink: Mutex<SplitSink<WebSocket, Message>>,
}

#[async_trait]
impl Observer for SocketObserver {
    async fn send(&self, payload: &str) -> anyhow::Result<()> {
        self.sink
            .lock()
            .await
            .send(Message::Text(payload.to_owned().into()))
            .await?;
        Ok(())
    }
}

pub async fn websocket(State(state): State<AppState>, upgrade: WebSocketUpgrade) -> Response {
    upgrade.on_upgrade(move |socket| serve_socket(socket, state.bus))
}

async fn serve_socket(socket: WebSocket, bus: LiveUpdateBus) {
    let (sink, mut stream) = socket.split();
    let id = bus
        .connect(Arc::new(SocketObserver {
            sink: Mutex::new(sink),
        }))
        .await;

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    bus.disconnect(id).await;
    debug!(observer_id = id, "Websocket closed");
}
