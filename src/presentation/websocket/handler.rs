//! WebSocket endpoint and per-connection socket loop.
//!
//! Each accepted socket gets one task that owns both halves of the
//! connection. Inbound frames are decoded into [`ClientEvent`]s and
//! dispatched to the relay one at a time: the next frame is not read
//! until the previous handler finished, which is what gives senders
//! their in-order guarantee. Outbound events arrive over the
//! connection's unbounded channel and are serialized onto the wire in
//! between.
//!
//! Liveness mirrors the usual 25s/60s heartbeat: the server pings on
//! `ping_interval` and drops the connection when no pong arrived
//! within `pong_timeout`. Client pings are answered by the framework.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::WebSocketSettings;
use crate::startup::AppState;

use super::error::RelayError;
use super::events::ClientEvent;
use super::relay::Relay;

/// `GET /gateway`: upgrade to the relay protocol.
pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let limits = state.settings.websocket.clone();
    let relay = state.relay.clone();
    ws.max_message_size(limits.max_message_size)
        .max_frame_size(limits.max_frame_size)
        .on_upgrade(move |socket| handle_socket(socket, relay, limits))
}

async fn handle_socket(socket: WebSocket, relay: Arc<Relay>, settings: WebSocketSettings) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    let conn = relay.registry().register(outbound_tx);
    info!(connection = %conn, "websocket connected");

    let mut ping = tokio::time::interval(Duration::from_secs(settings.ping_interval_secs));
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let pong_timeout = Duration::from_secs(settings.pong_timeout_secs);
    let mut last_pong = Instant::now();

    loop {
        tokio::select! {
            outbound = outbound_rx.recv() => {
                // The channel cannot close while the registry holds the
                // sender, but a failed write means the peer is gone
                let Some(event) = outbound else { break };
                match serde_json::to_string(&event) {
                    Ok(text) => {
                        if ws_tx.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!(connection = %conn, error = %err, "failed to encode outbound event");
                    }
                }
            }

            inbound = ws_rx.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientEvent>(&text) {
                            Ok(event) => relay.dispatch(conn, event).await,
                            Err(err) => {
                                debug!(connection = %conn, error = %err, "unparseable frame");
                                relay.reject(
                                    conn,
                                    "frame",
                                    RelayError::Validation("Unrecognized event".into()),
                                );
                            }
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        relay.reject(
                            conn,
                            "frame",
                            RelayError::Validation("Binary frames are not supported".into()),
                        );
                    }
                    Some(Ok(Message::Pong(_))) => {
                        last_pong = Instant::now();
                    }
                    // Client pings are answered by axum itself
                    Some(Ok(Message::Ping(_))) => {}
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        debug!(connection = %conn, error = %err, "websocket read error");
                        break;
                    }
                }
            }

            _ = ping.tick() => {
                if last_pong.elapsed() > pong_timeout {
                    warn!(connection = %conn, "pong timeout; dropping connection");
                    break;
                }
                if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
        }
    }

    relay.registry().unregister(conn);
    info!(connection = %conn, "websocket disconnected");
}
