// ============================
// backend-lib/src/hub.rs
// ============================
//! Connection hub: the live subscriber set of every board.
//!
//! Each subscriber owns a bounded outbound queue drained by its connection's
//! writer task. Broadcasts serialize the snapshot once and `try_send` the
//! encoded frame to every queue, so a slow or dead connection only loses its
//! own frames and never holds up the rest of the board.
use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use metrics::counter;
use pokerboard_common::{ServerToClient, Snapshot};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::board::BoardId;
use crate::error::AppError;
use crate::metrics as keys;

pub type ConnectionId = Uuid;

/// An encoded JSON frame, shared between every queue it is pushed to
pub type Frame = Arc<str>;

/// Outbound queue of one connection
pub type FrameSink = mpsc::Sender<Frame>;

/// Serialize a server frame once for fan-out
pub fn encode_frame(frame: &ServerToClient) -> Result<Frame, AppError> {
    Ok(Arc::from(serde_json::to_string(frame)?))
}

/// One connection's registration with a board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub connection_id: ConnectionId,
    pub board_id: BoardId,
    pub name: String,
}

struct Subscriber {
    name: String,
    sink: FrameSink,
}

/// Outcome of pushing a frame to one queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Queue full, frame dropped for this connection only
    Dropped,
    /// Receiver gone, connection is shutting down
    Closed,
}

fn deliver(connection_id: ConnectionId, sink: &FrameSink, frame: &Frame) -> Delivery {
    match sink.try_send(Arc::clone(frame)) {
        Ok(()) => Delivery::Sent,
        Err(TrySendError::Full(_)) => {
            warn!(%connection_id, "outbound queue full, dropping frame");
            counter!(keys::FRAME_DROPPED, "reason" => "full").increment(1);
            Delivery::Dropped
        },
        Err(TrySendError::Closed(_)) => {
            debug!(%connection_id, "outbound queue closed, skipping");
            counter!(keys::FRAME_DROPPED, "reason" => "closed").increment(1);
            Delivery::Closed
        },
    }
}

/// Per-board subscriber registry
#[derive(Default)]
pub struct Hub {
    boards: DashMap<BoardId, HashMap<ConnectionId, Subscriber>>,
    connections: DashMap<ConnectionId, BoardId>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and hand it `snapshot` straight away.
    pub fn subscribe(
        &self,
        board_id: &str,
        connection_id: ConnectionId,
        name: &str,
        sink: FrameSink,
        snapshot: &Snapshot,
    ) -> Delivery {
        let first = encode_frame(&ServerToClient::QueryUpdated(snapshot.clone()));

        self.connections.insert(connection_id, board_id.to_string());
        self.boards.entry(board_id.to_string()).or_default().insert(
            connection_id,
            Subscriber {
                name: name.to_string(),
                sink: sink.clone(),
            },
        );
        debug!(board_id, %connection_id, name, "subscribed");

        match first {
            Ok(frame) => deliver(connection_id, &sink, &frame),
            Err(e) => {
                error!(board_id, error = %e, "failed to encode snapshot");
                Delivery::Dropped
            },
        }
    }

    /// Remove a connection. Returns what it was subscribed as, if anything.
    pub fn unsubscribe(&self, connection_id: ConnectionId) -> Option<Subscription> {
        let (_, board_id) = self.connections.remove(&connection_id)?;

        let subscriber = self
            .boards
            .get_mut(&board_id)
            .and_then(|mut subscribers| subscribers.remove(&connection_id));
        self.boards
            .remove_if(&board_id, |_, subscribers| subscribers.is_empty());

        let subscriber = subscriber?;
        debug!(%board_id, %connection_id, name = %subscriber.name, "unsubscribed");
        Some(Subscription {
            connection_id,
            board_id,
            name: subscriber.name,
        })
    }

    /// Push `snapshot` to every subscriber of `board_id`.
    /// Returns the number of queues that accepted the frame.
    pub fn broadcast(&self, board_id: &str, snapshot: &Snapshot) -> usize {
        self.broadcast_except(board_id, snapshot, None)
    }

    /// Same as [`Hub::broadcast`], skipping one connection.
    pub fn broadcast_except(
        &self,
        board_id: &str,
        snapshot: &Snapshot,
        skip: Option<ConnectionId>,
    ) -> usize {
        let Some(subscribers) = self.boards.get(board_id) else {
            return 0;
        };

        let frame = match encode_frame(&ServerToClient::QueryUpdated(snapshot.clone())) {
            Ok(frame) => frame,
            Err(e) => {
                error!(board_id, error = %e, "failed to encode snapshot");
                return 0;
            },
        };

        subscribers
            .iter()
            .filter(|(connection_id, _)| Some(**connection_id) != skip)
            .filter(|(connection_id, subscriber)| {
                deliver(**connection_id, &subscriber.sink, &frame) == Delivery::Sent
            })
            .count()
    }

    pub fn subscriber_count(&self, board_id: &str) -> usize {
        self.boards.get(board_id).map_or(0, |subscribers| subscribers.len())
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}
