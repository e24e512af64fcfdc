// ============================
// backend-lib/src/board_manager.rs
// ============================
//! Board management and actor coordination.
use dashmap::DashMap;
use metrics::{counter, gauge};
use std::sync::Arc;
use tracing::{info, warn};

use crate::board::BoardId;
use crate::board_actor::{spawn_board_actor, BoardHandle};
use crate::hub::Hub;
use crate::metrics as keys;

/// Arena of board actors, addressed by id
pub struct BoardManager {
    boards: DashMap<BoardId, BoardHandle>,
    hub: Arc<Hub>,
    queue_capacity: usize,
}

impl BoardManager {
    /// Create a new board manager
    pub fn new(hub: Arc<Hub>, queue_capacity: usize) -> Self {
        BoardManager {
            boards: DashMap::new(),
            hub,
            queue_capacity,
        }
    }

    /// Get the handle for a board, spawning its actor on first reference.
    ///
    /// A handle whose actor has stopped is replaced by a fresh, empty board
    /// so one failed board never takes the others down with it.
    pub fn get_or_create(&self, board_id: &str) -> BoardHandle {
        if let Some(handle) = self.boards.get(board_id) {
            if !handle.is_closed() {
                return handle.clone();
            }
        }

        let mut entry = self.boards.entry(board_id.to_string()).or_insert_with(|| {
            info!(board_id, "creating board");
            counter!(keys::BOARD_CREATED).increment(1);
            spawn_board_actor(board_id, self.hub.clone(), self.queue_capacity)
        });

        if entry.is_closed() {
            warn!(board_id, "board actor stopped, respawning");
            counter!(keys::BOARD_RESPAWNED).increment(1);
            *entry = spawn_board_actor(board_id, self.hub.clone(), self.queue_capacity);
        }

        let handle = entry.clone();
        drop(entry);

        #[allow(clippy::cast_precision_loss)]
        gauge!(keys::BOARD_ACTIVE).set(self.boards.len() as f64);
        handle
    }

    pub fn len(&self) -> usize {
        self.boards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }
}
