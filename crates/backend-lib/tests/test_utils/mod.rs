//! Shared helpers for the integration tests.
//!
//! Each test spawns its own server on an ephemeral port so tests can run in
//! parallel without sharing boards.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use backend_lib::{config::Settings, ws_router::create_router, AppState};
use futures_util::{SinkExt, StreamExt};
use pokerboard_common::{ServerToClient, Snapshot};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub fn test_state() -> Arc<AppState> {
    Arc::new(AppState::new(Settings::default()))
}

/// Start a server on `127.0.0.1:0` and return its address
pub async fn spawn_server() -> (SocketAddr, Arc<AppState>) {
    spawn_server_with(Settings::default()).await
}

pub async fn spawn_server_with(settings: Settings) -> (SocketAddr, Arc<AppState>) {
    let state = Arc::new(AppState::new(settings));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_router(Arc::clone(&state));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, state)
}

pub async fn connect(addr: SocketAddr, board: &str, name: &str) -> Client {
    let url = format!("ws://{addr}/ws/board/{board}?name={name}");
    let (stream, _) = tokio_tungstenite::connect_async(url)
        .await
        .expect("Failed to connect");
    stream
}

pub async fn send_json(client: &mut Client, value: serde_json::Value) {
    client
        .send(Message::text(value.to_string()))
        .await
        .unwrap();
}

/// Next server frame, failing the test after a few seconds of silence
pub async fn next_frame(client: &mut Client) -> ServerToClient {
    loop {
        let message = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("Timed out waiting for a frame")
            .expect("Stream ended")
            .expect("WebSocket error");
        if let Message::Text(text) = message {
            return serde_json::from_str(text.as_str()).expect("Invalid server frame");
        }
    }
}

/// Read snapshots until one satisfies `pred`
pub async fn snapshot_where(client: &mut Client, pred: impl Fn(&Snapshot) -> bool) -> Snapshot {
    loop {
        if let ServerToClient::QueryUpdated(snapshot) = next_frame(client).await {
            if pred(&snapshot) {
                return snapshot;
            }
        }
    }
}

/// Read frames until an error frame arrives and return its code
pub async fn next_error(client: &mut Client) -> String {
    loop {
        if let ServerToClient::Error { code, .. } = next_frame(client).await {
            return code;
        }
    }
}
