// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for metric keys
pub const WS_CONNECTION: &str = "ws.connection";
pub const WS_DISCONNECTION: &str = "ws.disconnection";
pub const WS_ACTIVE: &str = "ws.active";
pub const BOARD_CREATED: &str = "board.created";
pub const BOARD_RESPAWNED: &str = "board.respawned";
pub const BOARD_ACTIVE: &str = "board.active";
pub const COMMAND_APPLIED: &str = "command.applied";
pub const COMMAND_REJECTED: &str = "command.rejected";
pub const BROADCAST_RECIPIENTS: &str = "broadcast.recipients";
pub const FRAME_DROPPED: &str = "frame.dropped";
pub const WS_IDLE_TIMEOUT: &str = "ws.idle_timeout";
