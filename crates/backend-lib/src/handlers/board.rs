// ============================
// crates/backend-lib/src/handlers/board.rs
// ============================
//! Read-only board endpoints used for the initial page load.
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use pokerboard_common::Snapshot;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::validation::validate_board_id;
use crate::AppState;

/// `GET /board/{id}`: current snapshot, creating the board if unseen
pub async fn get_snapshot(
    Path(board_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Snapshot>, AppError> {
    let board_id = validate_board_id(&board_id)?;
    let snapshot = state.boards.get_or_create(board_id).snapshot().await?;
    Ok(Json(snapshot))
}

/// `GET /health`
pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "boards": state.boards.len(),
        "connections": state.hub.connection_count(),
    }))
}
