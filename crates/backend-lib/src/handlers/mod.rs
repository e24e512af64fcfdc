//! HTTP handlers.

pub mod board;

pub use board::{get_snapshot, health};
