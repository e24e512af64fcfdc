// ================
// common/src/lib.rs
// ================
//! Common types and structures
//! used for communication between the planning-poker client and server.
//! This module defines the WebSocket protocol frames, the vote scale and the
//! board snapshot every client renders from.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The ordered estimate scale a vote may be drawn from.
pub const SCALE: [u8; 6] = [1, 2, 3, 5, 8, 13];

/// Wire value meaning "no vote".
pub const ABSTAIN_WIRE: i64 = 0;

/// A single participant's vote for the current round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Vote {
    /// No estimate submitted (or explicitly withdrawn)
    #[default]
    Abstain,
    /// One value from [`SCALE`]
    Estimate(u8),
}

/// Rejection of a wire value that is neither abstain nor on the scale
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("vote {0} is not on the estimate scale {SCALE:?}")]
pub struct VoteError(pub i64);

impl Vote {
    /// Build an estimate, checking it against the scale.
    pub fn estimate(value: u8) -> Result<Self, VoteError> {
        if SCALE.contains(&value) {
            Ok(Vote::Estimate(value))
        } else {
            Err(VoteError(i64::from(value)))
        }
    }

    /// The estimate value, `None` for an abstention.
    pub fn value(self) -> Option<u8> {
        match self {
            Vote::Abstain => None,
            Vote::Estimate(value) => Some(value),
        }
    }

    pub fn is_abstain(self) -> bool {
        matches!(self, Vote::Abstain)
    }
}

impl TryFrom<i64> for Vote {
    type Error = VoteError;

    fn try_from(wire: i64) -> Result<Self, Self::Error> {
        if wire == ABSTAIN_WIRE {
            return Ok(Vote::Abstain);
        }
        let value = u8::try_from(wire).map_err(|_| VoteError(wire))?;
        Vote::estimate(value)
    }
}

impl From<Vote> for i64 {
    fn from(vote: Vote) -> Self {
        vote.value().map_or(ABSTAIN_WIRE, i64::from)
    }
}

/// Frames sent from client to server
///
/// Externally tagged, e.g. `{"ParticipantVoted": {"vote": 3}}`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub enum ClientToServer {
    /// Submit (or replace) this participant's vote
    /// # Fields
    /// * `vote` - `0` to abstain, otherwise a value from [`SCALE`]
    ParticipantVoted { vote: i64 },
    /// Reveal all votes. Older clients send this as `Done`.
    #[serde(alias = "Done")]
    Reveal {},
    /// Clear every vote and start a new round
    #[serde(alias = "ClearVotes")]
    Reset {},
}

/// Frames sent from server to client
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ServerToClient {
    /// The board changed; render from this snapshot
    QueryUpdated(Snapshot),
    /// A command from this connection was rejected
    Error {
        /// Stable machine-readable code
        code: String,
        /// Human-readable description
        message: String,
    },
}

/// One roster entry as seen by clients
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ParticipantView {
    pub name: String,
    /// Whether a non-abstain vote is recorded
    pub voted: bool,
    /// The vote value, only populated once the round is revealed
    pub vote: Option<u8>,
    /// Whether at least one connection for this name is open
    pub connected: bool,
}

/// Aggregate statistics over the revealed votes
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Stats {
    /// Number of non-abstain votes
    pub count: usize,
    /// Arithmetic mean of the non-abstain votes
    pub mean: f64,
    /// Scale value -> number of votes, only values that received votes
    pub histogram: BTreeMap<u8, usize>,
}

impl Stats {
    /// Compute statistics from a set of votes. Returns `None` when nobody voted.
    pub fn from_votes<I>(votes: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vote>,
    {
        let mut histogram = BTreeMap::new();
        let mut sum = 0u64;
        let mut count = 0usize;
        for value in votes.into_iter().filter_map(Vote::value) {
            *histogram.entry(value).or_insert(0) += 1;
            sum += u64::from(value);
            count += 1;
        }
        if count == 0 {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let mean = sum as f64 / count as f64;
        Some(Stats { count, mean, histogram })
    }
}

/// Read-only projection of a board, pushed to every subscriber
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    /// Roster sorted by name
    pub participants: Vec<ParticipantView>,
    /// `true` once the round has been revealed
    pub voting_complete: bool,
    /// Present only when `voting_complete` is set
    pub stats: Option<Stats>,
}

impl Snapshot {
    pub fn participant(&self, name: &str) -> Option<&ParticipantView> {
        self.participants.iter().find(|p| p.name == name)
    }
}
