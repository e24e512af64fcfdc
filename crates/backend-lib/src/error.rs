// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pokerboard_common::{ServerToClient, VoteError};
use thiserror::Error;

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Command not allowed while the board is {phase}")]
    InvalidState { phase: &'static str },

    #[error("Cannot reveal a board with no votes")]
    EmptyBoard,

    #[error("Malformed command: {0}")]
    MalformedCommand(String),

    #[error("Board {0} is busy, command rejected")]
    Overloaded(String),

    #[error("Board {0} is unavailable")]
    BoardUnavailable(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidState { .. } | AppError::EmptyBoard => StatusCode::CONFLICT,
            AppError::MalformedCommand(_) | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::Overloaded(_) | AppError::BoardUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            },
            AppError::Json(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidState { .. } => "STATE_001",
            AppError::EmptyBoard => "STATE_002",
            AppError::MalformedCommand(_) => "CMD_001",
            AppError::Overloaded(_) => "BUSY_001",
            AppError::BoardUnavailable(_) => "BOARD_001",
            AppError::InvalidInput(_) => "VAL_001",
            AppError::Json(_) => "JSON_001",
        }
    }

    /// Get a sanitized message suitable for production use
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::InvalidState { .. } | AppError::EmptyBoard | AppError::MalformedCommand(_) => {
                self.to_string()
            },
            AppError::Overloaded(_) => "Board is busy, please retry".to_string(),
            AppError::BoardUnavailable(_) => "Board is temporarily unavailable".to_string(),
            AppError::InvalidInput(_) => "Invalid input provided".to_string(),
            AppError::Json(_) => "An internal server error occurred".to_string(),
        }
    }

    fn message(&self) -> String {
        // Use detailed messages in development, sanitized in production
        if cfg!(debug_assertions) {
            self.to_string()
        } else {
            self.sanitized_message()
        }
    }

    /// Error frame sent back over the socket to the offending client only
    pub fn to_frame(&self) -> ServerToClient {
        ServerToClient::Error {
            code: self.error_code().to_string(),
            message: self.message(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = serde_json::json!({
            "error": {
                "code": self.error_code(),
                "message": self.message(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<VoteError> for AppError {
    fn from(err: VoteError) -> Self {
        AppError::MalformedCommand(err.to_string())
    }
}
