// ==================
// crates/backend-lib/src/websocket.rs
// ==================
//! WebSocket session gateway
//!
//! One task per connection. The connection is bound to a `(board, name)`
//! pair resolved from the upgrade request:
//! - on open it is registered with the board actor, which subscribes it with
//!   the hub and queues the current snapshot;
//! - each text frame is decoded into a [`BoardCommand`] and sent to the
//!   actor; rejections come back as an error frame to this connection only;
//! - on close, read error, writer failure or heartbeat timeout it is
//!   unsubscribed, which marks the participant offline once its last
//!   connection is gone.
//!
//! Outbound frames flow through a bounded queue drained by a dedicated
//! writer task, so a stalled socket never blocks the board.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use metrics::{counter, gauge};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::board::BoardId;
use crate::board_actor::BoardHandle;
use crate::error::AppError;
use crate::hub::{encode_frame, ConnectionId, Frame, FrameSink, Hub};
use crate::messages::{parse_client_frame, BoardCommand};
use crate::metrics as keys;
use crate::validation::{validate_board_id, validate_participant_name};
use crate::AppState;

/// Query string of the upgrade request
#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    pub name: String,
}

/// Handler for `GET /ws/board/{id}?name=...`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(board_id): Path<String>,
    Query(params): Query<ConnectParams>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let board_id = validate_board_id(&board_id)?.to_string();
    let name = validate_participant_name(&params.name, state.settings.max_name_len)?.to_string();

    counter!(keys::WS_CONNECTION).increment(1);

    Ok(ws.on_upgrade(move |socket| handle_connection(socket, state, board_id, name)))
}

/// Queue a frame for this connection only. Dropped if the queue is full.
fn send_direct(connection_id: ConnectionId, sink: &FrameSink, err: &AppError) {
    let frame = match encode_frame(&err.to_frame()) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(%connection_id, error = %e, "failed to encode error frame");
            return;
        },
    };
    if sink.try_send(frame).is_err() {
        warn!(%connection_id, "could not queue error frame");
        counter!(keys::FRAME_DROPPED, "reason" => "error_frame").increment(1);
    }
}

async fn apply_text(board: &BoardHandle, name: &str, text: &str) -> Result<(), AppError> {
    let msg = parse_client_frame(text)?;
    let command = BoardCommand::from_client(name, msg)?;
    board.apply(command).await
}

/// Run one text frame through the board actor, answering rejections on `sink`
async fn process_text(
    board: &BoardHandle,
    connection_id: ConnectionId,
    name: &str,
    text: &str,
    sink: &FrameSink,
) {
    if let Err(e) = apply_text(board, name, text).await {
        debug!(board_id = board.board_id(), %connection_id, error = %e, "command rejected");
        send_direct(connection_id, sink, &e);
    }
}

/// Unregister a connection. If the actor is gone, drop the hub entry directly.
async fn release(board: &BoardHandle, hub: &Hub, connection_id: ConnectionId) {
    if let Err(e) = board.disconnect(connection_id).await {
        warn!(board_id = board.board_id(), %connection_id, error = %e, "could not unregister connection");
        hub.unsubscribe(connection_id);
    }
}

pub async fn handle_connection(
    socket: WebSocket,
    state: Arc<AppState>,
    board_id: BoardId,
    name: String,
) {
    let connection_id = Uuid::new_v4();
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (sink, mut outbound) = mpsc::channel::<Frame>(state.settings.subscriber_buffer);
    let (ping_tx, mut ping_rx) = mpsc::channel::<()>(1);

    // Writer: forward queued frames and pings until the queue closes or a write fails
    let mut send_task = tokio::spawn(async move {
        loop {
            let message = tokio::select! {
                frame = outbound.recv() => match frame {
                    Some(frame) => Message::Text(String::from(&*frame).into()),
                    None => break,
                },
                Some(()) = ping_rx.recv() => Message::Ping(Bytes::new()),
            };
            if ws_tx.send(message).await.is_err() {
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    let board = state.boards.get_or_create(&board_id);
    if let Err(e) = board.connect(connection_id, name.clone(), sink.clone()).await {
        warn!(%board_id, %connection_id, error = %e, "could not register connection");
        send_direct(connection_id, &sink, &e);
        drop(sink);
        let _ = send_task.await;
        return;
    }

    gauge!(keys::WS_ACTIVE).increment(1.0);
    info!(%board_id, %connection_id, %name, "websocket session started");

    let idle_timeout = state.settings.idle_timeout();
    let mut heartbeat = tokio::time::interval(state.settings.heartbeat_interval());
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_seen = Instant::now();

    loop {
        tokio::select! {
            incoming = ws_rx.next() => {
                let message = match incoming {
                    Some(Ok(message)) => message,
                    Some(Err(e)) => {
                        debug!(%connection_id, error = %e, "websocket receive error");
                        break;
                    },
                    None => break,
                };
                last_seen = Instant::now();

                match message {
                    Message::Text(text) => {
                        process_text(&board, connection_id, &name, text.as_str(), &sink).await;
                    },
                    Message::Binary(_) => {
                        let e = AppError::MalformedCommand(
                            "binary frames are not supported".to_string(),
                        );
                        send_direct(connection_id, &sink, &e);
                    },
                    Message::Close(_) => break,
                    // pongs only refresh `last_seen`; pings are answered by axum
                    _ => {},
                }
            },
            _ = heartbeat.tick() => {
                if last_seen.elapsed() >= idle_timeout {
                    info!(%board_id, %connection_id, %name, "no traffic within idle timeout, dropping");
                    counter!(keys::WS_IDLE_TIMEOUT).increment(1);
                    break;
                }
                // a ping still waiting in the queue is enough
                let _ = ping_tx.try_send(());
            },
            _ = &mut send_task => {
                debug!(%connection_id, "socket write failed");
                break;
            },
        }
    }

    release(&board, &state.hub, connection_id).await;

    counter!(keys::WS_DISCONNECTION).increment(1);
    gauge!(keys::WS_ACTIVE).decrement(1.0);
    info!(%board_id, %connection_id, %name, "websocket session ended");

    // Stop the writer; the hub's copy of the sink is gone after release
    drop(sink);
    send_task.abort();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board_actor::detached_handle;
    use pokerboard_common::{ServerToClient, Snapshot};

    fn error_code(frame: &Frame) -> String {
        match serde_json::from_str::<ServerToClient>(frame).unwrap() {
            ServerToClient::Error { code, .. } => code,
            other => panic!("Expected an error frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_busy_board_answers_with_error_frame() {
        let (board, _inbox) = detached_handle("busy", 1);
        let (sink, mut rx) = mpsc::channel(4);
        let connection_id = Uuid::new_v4();

        // nothing drains the inbox, so one parked disconnect fills it
        board.disconnect(Uuid::new_v4()).await.unwrap();

        process_text(&board, connection_id, "alice", r#"{"Reveal":{}}"#, &sink).await;
        assert_eq!(error_code(&rx.try_recv().unwrap()), "BUSY_001");

        process_text(
            &board,
            connection_id,
            "alice",
            r#"{"ParticipantVoted":{"vote":3}}"#,
            &sink,
        )
        .await;
        assert_eq!(error_code(&rx.try_recv().unwrap()), "BUSY_001");
    }

    #[tokio::test]
    async fn test_malformed_text_answers_with_error_frame() {
        let (board, mut inbox) = detached_handle("1", 4);
        let (sink, mut rx) = mpsc::channel(4);

        process_text(&board, Uuid::new_v4(), "alice", "{\"Vote\":1}", &sink).await;
        assert_eq!(error_code(&rx.try_recv().unwrap()), "CMD_001");

        process_text(
            &board,
            Uuid::new_v4(),
            "alice",
            r#"{"ParticipantVoted":{"vote":4}}"#,
            &sink,
        )
        .await;
        assert_eq!(error_code(&rx.try_recv().unwrap()), "CMD_001");

        // rejected before reaching the actor
        assert!(inbox.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_release_without_actor_clears_hub() {
        let hub = Hub::new();
        let (sink, _rx) = mpsc::channel(4);
        let connection_id = Uuid::new_v4();
        hub.subscribe("1", connection_id, "alice", sink, &Snapshot::default());

        let (board, inbox) = detached_handle("1", 4);
        drop(inbox);

        release(&board, &hub, connection_id).await;
        assert_eq!(hub.connection_count(), 0);
        assert_eq!(hub.subscriber_count("1"), 0);
    }
}
