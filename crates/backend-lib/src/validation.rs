// ============================
// crates/backend-lib/src/validation.rs
// ============================
//! Validation of the board id and participant name resolved from a request.
//!
//! Names come from an external identity layer and are otherwise trusted as
//! opaque strings; only their shape is checked here.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

use crate::error::AppError;

const MAX_BOARD_ID_LENGTH: usize = 64;

static BOARD_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("board id pattern compiles"));

/// Possible validation errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid board ID: {0}")]
    InvalidBoardId(String),

    #[error("Invalid participant name: {0}")]
    InvalidName(String),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate a board ID
pub fn validate_board_id(board_id: &str) -> ValidationResult<&str> {
    if board_id.is_empty() {
        return Err(ValidationError::InvalidBoardId(
            "Board ID must not be empty".to_string(),
        ));
    }

    if board_id.len() > MAX_BOARD_ID_LENGTH {
        return Err(ValidationError::InvalidBoardId(format!(
            "Board ID must be at most {MAX_BOARD_ID_LENGTH} characters"
        )));
    }

    if !BOARD_ID_REGEX.is_match(board_id) {
        return Err(ValidationError::InvalidBoardId(
            "Board ID must contain only alphanumeric characters, hyphens and underscores"
                .to_string(),
        ));
    }

    Ok(board_id)
}

/// Validate a participant name. The name is used as given, never normalized.
pub fn validate_participant_name(name: &str, max_len: usize) -> ValidationResult<&str> {
    if name.trim().is_empty() {
        return Err(ValidationError::InvalidName(
            "Name must not be empty".to_string(),
        ));
    }

    if name.trim() != name {
        return Err(ValidationError::InvalidName(
            "Name must not start or end with whitespace".to_string(),
        ));
    }

    if name.chars().count() > max_len {
        return Err(ValidationError::InvalidName(format!(
            "Name must be at most {max_len} characters"
        )));
    }

    if name.chars().any(char::is_control) {
        return Err(ValidationError::InvalidName(
            "Name must not contain control characters".to_string(),
        ));
    }

    Ok(name)
}
