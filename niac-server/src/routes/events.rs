//! `WS /api/v1/events` (`spec.md` §6): streams the stats snapshot at 1 Hz
//! and fans out log lines as they're emitted, multiplexed onto one
//! WebSocket as tagged JSON frames.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Event<'a> {
    Stats { snapshot: niac_engine::stats::StatsSnapshot },
    Log { line: &'a str },
}

pub async fn events(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut log_rx = state.log_broadcaster.subscribe();
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(1));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Ok(snapshot) = state.supervisor.stats().await else { continue };
                let Ok(text) = serde_json::to_string(&Event::Stats { snapshot }) else { continue };
                if sender.send(Message::Text(text)).await.is_err() {
                    return;
                }
            }
            line = log_rx.recv() => {
                match line {
                    Ok(line) => {
                        let Ok(text) = serde_json::to_string(&Event::Log { line: &line }) else { continue };
                        if sender.send(Message::Text(text)).await.is_err() {
                            return;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => return,
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None => return,
                    Some(Err(_)) => return,
                    _ => {}
                }
            }
        }
    }
}
