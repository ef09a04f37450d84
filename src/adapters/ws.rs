//! Realtime log subscription endpoint (`/ws/logs`).
//!
//! Push-only: the server streams `new_log` events; inbound frames are used
//! purely as a liveness signal and are otherwise ignored.

use std::sync::Arc;

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};

use crate::{adapters::AppState, core::LogFanout};

pub async fn ws_logs(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let fanout = state.fanout.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, fanout))
}

async fn handle_socket(mut socket: WebSocket, fanout: Arc<LogFanout>) {
    let (id, mut events) = fanout.attach();
    tracing::debug!(subscriber = id, "log subscriber attached");

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(text) => {
                        if socket.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    // Channel closed: the fanout swept us after a failed send.
                    None => break,
                }
            }
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    // Heartbeats and any other inbound traffic are ignored.
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    fanout.detach(id);
    tracing::debug!(subscriber = id, "log subscriber detached");
}
