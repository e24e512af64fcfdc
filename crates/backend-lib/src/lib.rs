// ============================
// backend-lib/src/lib.rs
// ============================
//! Core library of the planning-poker board server.
//!
//! Each board is owned by one actor task that serializes every mutation.
//! Connections subscribe to a board through the [`hub::Hub`], which fans
//! snapshots out without waiting on any single client.

pub mod board;
pub mod board_actor;
pub mod board_manager;
pub mod config;
pub mod error;
pub mod handlers;
pub mod hub;
pub mod logging;
pub mod messages;
pub mod metrics;
pub mod validation;
pub mod websocket;
pub mod ws_router;

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::board_manager::BoardManager;
use crate::config::Settings;
use crate::hub::Hub;

/// Application state shared across all handlers
pub struct AppState {
    /// Settings manager
    pub settings: Arc<Settings>,
    /// Connection registry used for broadcasts
    pub hub: Arc<Hub>,
    /// Live board actors
    pub boards: Arc<BoardManager>,
}

impl AppState {
    /// Create a new application state
    pub fn new(settings: Settings) -> Self {
        let hub = Arc::new(Hub::default());
        let boards = Arc::new(BoardManager::new(
            Arc::clone(&hub),
            settings.command_queue_capacity,
        ));
        Self {
            settings: Arc::new(settings),
            hub,
            boards,
        }
    }
}

/// Serve the application on an already bound listener
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "listening");
    }
    axum::serve(listener, ws_router::create_router(state)).await
}
