// ================
// crates/backend-lib/src/messages.rs
// ================
//! Commands dispatched to a board actor, and decoding of inbound frames.
use pokerboard_common::{ClientToServer, Vote};

use crate::error::AppError;

/// A validated mutation for one board
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardCommand {
    SubmitVote { name: String, vote: Vote },
    Reveal,
    Reset,
}

impl BoardCommand {
    /// Turn a client frame into a command on behalf of `name`.
    /// Votes off the scale are rejected here, before reaching the actor.
    pub fn from_client(name: &str, msg: ClientToServer) -> Result<Self, AppError> {
        match msg {
            ClientToServer::ParticipantVoted { vote } => Ok(BoardCommand::SubmitVote {
                name: name.to_string(),
                vote: Vote::try_from(vote)?,
            }),
            ClientToServer::Reveal {} => Ok(BoardCommand::Reveal),
            ClientToServer::Reset {} => Ok(BoardCommand::Reset),
        }
    }

    /// Short label used for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            BoardCommand::SubmitVote { .. } => "submit_vote",
            BoardCommand::Reveal => "reveal",
            BoardCommand::Reset => "reset",
        }
    }
}

/// Decode a text frame into a client message
pub fn parse_client_frame(text: &str) -> Result<ClientToServer, AppError> {
    serde_json::from_str(text).map_err(|e| AppError::MalformedCommand(e.to_string()))
}
