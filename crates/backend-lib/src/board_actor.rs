// ============================
// backend-lib/src/board_actor.rs
// ============================
//! Single-writer actor around one [`Board`].
//!
//! Every mutation of a board, including connection bookkeeping, goes
//! through the actor's bounded inbox and is applied in arrival order. After
//! each change the actor pushes the new snapshot through the [`Hub`].
use std::sync::Arc;

use metrics::{counter, histogram};
use pokerboard_common::Snapshot;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::board::{Board, BoardId};
use crate::error::AppError;
use crate::hub::{ConnectionId, Delivery, FrameSink, Hub};
use crate::messages::BoardCommand;
use crate::metrics as keys;

/// Message sent *into* the actor
#[derive(Debug)]
pub enum ActorMsg {
    Command {
        command: BoardCommand,
        resp_tx: oneshot::Sender<Result<(), AppError>>,
    },
    Connect {
        connection_id: ConnectionId,
        name: String,
        sink: FrameSink,
        resp_tx: oneshot::Sender<()>,
    },
    Disconnect {
        connection_id: ConnectionId,
    },
    Snapshot {
        resp_tx: oneshot::Sender<Snapshot>,
    },
}

/// Handle that other components keep: the actor's command channel
#[derive(Clone, Debug)]
pub struct BoardHandle {
    board_id: BoardId,
    cmd_tx: mpsc::Sender<ActorMsg>,
}

impl BoardHandle {
    pub fn board_id(&self) -> &str {
        &self.board_id
    }

    /// `true` once the actor task has stopped
    pub fn is_closed(&self) -> bool {
        self.cmd_tx.is_closed()
    }

    /// Enqueue without waiting. A full inbox is reported as `Overloaded`.
    fn try_enqueue(&self, msg: ActorMsg) -> Result<(), AppError> {
        self.cmd_tx.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => AppError::Overloaded(self.board_id.clone()),
            mpsc::error::TrySendError::Closed(_) => {
                AppError::BoardUnavailable(self.board_id.clone())
            },
        })
    }

    /// Lifecycle messages wait for room rather than being dropped.
    async fn enqueue(&self, msg: ActorMsg) -> Result<(), AppError> {
        self.cmd_tx
            .send(msg)
            .await
            .map_err(|_| AppError::BoardUnavailable(self.board_id.clone()))
    }

    /// Apply a client command. Resolves once the command has been applied
    /// (and broadcast) or rejected.
    pub async fn apply(&self, command: BoardCommand) -> Result<(), AppError> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.try_enqueue(ActorMsg::Command { command, resp_tx })?;
        resp_rx
            .await
            .map_err(|_| AppError::BoardUnavailable(self.board_id.clone()))?
    }

    /// Register a connection. The current snapshot is queued on `sink`
    /// before this returns.
    pub async fn connect(
        &self,
        connection_id: ConnectionId,
        name: String,
        sink: FrameSink,
    ) -> Result<(), AppError> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.enqueue(ActorMsg::Connect {
            connection_id,
            name,
            sink,
            resp_tx,
        })
        .await?;
        resp_rx
            .await
            .map_err(|_| AppError::BoardUnavailable(self.board_id.clone()))
    }

    pub async fn disconnect(&self, connection_id: ConnectionId) -> Result<(), AppError> {
        self.enqueue(ActorMsg::Disconnect { connection_id }).await
    }

    pub async fn snapshot(&self) -> Result<Snapshot, AppError> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.try_enqueue(ActorMsg::Snapshot { resp_tx })?;
        resp_rx
            .await
            .map_err(|_| AppError::BoardUnavailable(self.board_id.clone()))
    }
}

pub struct BoardActor {
    board: Board,
    hub: Arc<Hub>,
}

impl BoardActor {
    pub fn new(board_id: BoardId, hub: Arc<Hub>) -> Self {
        BoardActor {
            board: Board::new(board_id),
            hub,
        }
    }

    fn broadcast(&self) {
        let snapshot = self.board.snapshot();
        let recipients = self.hub.broadcast(self.board.id(), &snapshot);
        #[allow(clippy::cast_precision_loss)]
        histogram!(keys::BROADCAST_RECIPIENTS).record(recipients as f64);
    }

    pub fn handle_command(&mut self, command: BoardCommand) -> Result<(), AppError> {
        let kind = command.kind();
        match self.board.apply(command) {
            Ok(()) => {
                debug!(board_id = self.board.id(), kind, "command applied");
                counter!(keys::COMMAND_APPLIED, "kind" => kind).increment(1);
                // re-submitting the same vote still echoes
                self.broadcast();
                Ok(())
            },
            Err(e) => {
                debug!(board_id = self.board.id(), kind, error = %e, "command rejected");
                counter!(keys::COMMAND_REJECTED, "code" => e.error_code()).increment(1);
                Err(e)
            },
        }
    }

    pub fn handle_connect(&mut self, connection_id: ConnectionId, name: &str, sink: FrameSink) {
        let was_online = self
            .board
            .participant(name)
            .is_some_and(|p| p.connected());
        self.board.connect(name);

        let snapshot = self.board.snapshot();
        let delivery = self
            .hub
            .subscribe(self.board.id(), connection_id, name, sink, &snapshot);
        info!(board_id = self.board.id(), %connection_id, name, "participant connected");

        // the socket went away before it was registered
        if delivery == Delivery::Closed {
            self.handle_disconnect(connection_id);
            return;
        }

        // another tab under a name that is already online changes nothing visible
        if !was_online {
            self.hub
                .broadcast_except(self.board.id(), &snapshot, Some(connection_id));
        }
    }

    pub fn handle_disconnect(&mut self, connection_id: ConnectionId) {
        let Some(subscription) = self.hub.unsubscribe(connection_id) else {
            return;
        };
        info!(
            board_id = self.board.id(),
            %connection_id,
            name = %subscription.name,
            "participant disconnected"
        );
        if self.board.disconnect(&subscription.name) {
            self.broadcast();
        }
    }

    pub fn handle(&mut self, msg: ActorMsg) {
        match msg {
            ActorMsg::Command { command, resp_tx } => {
                let result = self.handle_command(command);
                let _ = resp_tx.send(result);
            },
            ActorMsg::Connect {
                connection_id,
                name,
                sink,
                resp_tx,
            } => {
                self.handle_connect(connection_id, &name, sink);
                let _ = resp_tx.send(());
            },
            ActorMsg::Disconnect { connection_id } => self.handle_disconnect(connection_id),
            ActorMsg::Snapshot { resp_tx } => {
                let _ = resp_tx.send(self.board.snapshot());
            },
        }
    }

    pub async fn run(mut self, mut rx: mpsc::Receiver<ActorMsg>) {
        while let Some(msg) = rx.recv().await {
            self.handle(msg);
        }
        debug!(board_id = self.board.id(), "board actor stopped");
    }
}

/// A handle with no actor behind it, so tests control the inbox
#[cfg(test)]
pub(crate) fn detached_handle(
    board_id: &str,
    capacity: usize,
) -> (BoardHandle, mpsc::Receiver<ActorMsg>) {
    let (cmd_tx, cmd_rx) = mpsc::channel(capacity);
    let handle = BoardHandle {
        board_id: board_id.to_string(),
        cmd_tx,
    };
    (handle, cmd_rx)
}

/// Spawn a new board actor and return its handle
pub fn spawn_board_actor(board_id: &str, hub: Arc<Hub>, capacity: usize) -> BoardHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(capacity.max(1));
    let actor = BoardActor::new(board_id.to_string(), hub);

    tokio::spawn(actor.run(cmd_rx));

    BoardHandle {
        board_id: board_id.to_string(),
        cmd_tx,
    }
}
