// ============================
// backend-lib/src/board.rs
// ============================
//! Board state machine.
//!
//! A board is either `Open` (accepting votes, values hidden) or `Revealed`
//! (values visible, votes frozen). Everything here is synchronous; the
//! [`crate::board_actor`] is the only owner and serializes access.
use std::collections::HashMap;

use pokerboard_common::{ParticipantView, Snapshot, Stats, Vote};

use crate::error::AppError;
use crate::messages::BoardCommand;

pub type BoardId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Open,
    Revealed,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Open => "open",
            Phase::Revealed => "revealed",
        }
    }
}

/// A named voter and its liveness
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub name: String,
    pub vote: Vote,
    /// Open connections under this name (tabs share one entry)
    connections: usize,
}

impl Participant {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            vote: Vote::Abstain,
            connections: 0,
        }
    }

    pub fn connected(&self) -> bool {
        self.connections > 0
    }

    fn view(&self, revealed: bool) -> ParticipantView {
        ParticipantView {
            name: self.name.clone(),
            voted: !self.vote.is_abstain(),
            vote: if revealed { self.vote.value() } else { None },
            connected: self.connected(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Board {
    id: BoardId,
    participants: HashMap<String, Participant>,
    phase: Phase,
}

impl Board {
    pub fn new(id: impl Into<BoardId>) -> Self {
        Self {
            id: id.into(),
            participants: HashMap::new(),
            phase: Phase::Open,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn participant(&self, name: &str) -> Option<&Participant> {
        self.participants.get(name)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Unseen names are provisioned, never rejected.
    fn participant_mut(&mut self, name: &str) -> &mut Participant {
        self.participants
            .entry(name.to_string())
            .or_insert_with(|| Participant::new(name))
    }

    /// Record a new connection under `name`.
    pub fn connect(&mut self, name: &str) {
        self.participant_mut(name).connections += 1;
    }

    /// Drop one connection under `name`. Returns `true` if the participant
    /// just went offline. The vote and roster entry are kept.
    pub fn disconnect(&mut self, name: &str) -> bool {
        match self.participants.get_mut(name) {
            Some(participant) if participant.connections > 0 => {
                participant.connections -= 1;
                participant.connections == 0
            },
            _ => false,
        }
    }

    /// Insert or replace the vote for `name`. Only legal while open.
    pub fn submit_vote(&mut self, name: &str, vote: Vote) -> Result<(), AppError> {
        self.require(Phase::Open)?;
        self.participant_mut(name).vote = vote;
        Ok(())
    }

    /// Expose every vote. Needs at least one non-abstain vote.
    pub fn reveal(&mut self) -> Result<(), AppError> {
        self.require(Phase::Open)?;
        if self.participants.values().all(|p| p.vote.is_abstain()) {
            return Err(AppError::EmptyBoard);
        }
        self.phase = Phase::Revealed;
        Ok(())
    }

    /// Clear every vote and reopen the board.
    pub fn reset(&mut self) -> Result<(), AppError> {
        self.require(Phase::Revealed)?;
        for participant in self.participants.values_mut() {
            participant.vote = Vote::Abstain;
        }
        self.phase = Phase::Open;
        Ok(())
    }

    /// Dispatch a client command. The board is untouched on error.
    pub fn apply(&mut self, command: BoardCommand) -> Result<(), AppError> {
        match command {
            BoardCommand::SubmitVote { name, vote } => self.submit_vote(&name, vote),
            BoardCommand::Reveal => self.reveal(),
            BoardCommand::Reset => self.reset(),
        }
    }

    fn require(&self, phase: Phase) -> Result<(), AppError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(AppError::InvalidState {
                phase: self.phase.as_str(),
            })
        }
    }

    /// Project the board for clients. Vote values stay hidden until reveal.
    pub fn snapshot(&self) -> Snapshot {
        let revealed = self.phase == Phase::Revealed;

        let mut participants: Vec<ParticipantView> = self
            .participants
            .values()
            .map(|p| p.view(revealed))
            .collect();
        participants.sort_by(|a, b| a.name.cmp(&b.name));

        let stats = if revealed {
            Stats::from_votes(self.participants.values().map(|p| p.vote))
        } else {
            None
        };

        Snapshot {
            participants,
            voting_complete: revealed,
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_with_votes(votes: &[(&str, Vote)]) -> Board {
        let mut board = Board::new("test-board");
        for (name, vote) in votes {
            board.submit_vote(name, *vote).unwrap();
        }
        board
    }

    #[test]
    fn test_new_board_is_open_and_empty() {
        let board = Board::new("1");
        assert_eq!(board.phase(), Phase::Open);
        assert!(board.is_empty());

        let snapshot = board.snapshot();
        assert!(snapshot.participants.is_empty());
        assert!(!snapshot.voting_complete);
        assert!(snapshot.stats.is_none());
    }

    #[test]
    fn test_submit_vote_provisions_participant() {
        let board = board_with_votes(&[("alice", Vote::Estimate(3))]);
        let alice = board.participant("alice").unwrap();
        assert_eq!(alice.vote, Vote::Estimate(3));
        assert!(!alice.connected());
    }

    #[test]
    fn test_last_vote_wins() {
        let mut board = Board::new("1");
        board.submit_vote("alice", Vote::Estimate(3)).unwrap();
        board.submit_vote("bob", Vote::Estimate(8)).unwrap();
        board.submit_vote("alice", Vote::Estimate(5)).unwrap();

        assert_eq!(board.participant("alice").unwrap().vote, Vote::Estimate(5));
        assert_eq!(board.participant("bob").unwrap().vote, Vote::Estimate(8));
        assert_eq!(board.len(), 2);
    }

    #[test]
    fn test_resubmitting_same_vote_is_noop() {
        let mut board = board_with_votes(&[("alice", Vote::Estimate(2))]);
        let before = board.snapshot();
        board.submit_vote("alice", Vote::Estimate(2)).unwrap();
        assert_eq!(board.snapshot(), before);
    }

    #[test]
    fn test_vote_values_hidden_until_reveal() {
        let mut board = board_with_votes(&[
            ("alice", Vote::Estimate(3)),
            ("bob", Vote::Abstain),
        ]);

        let hidden = board.snapshot();
        assert!(hidden.participants.iter().all(|p| p.vote.is_none()));
        assert!(hidden.participant("alice").unwrap().voted);
        assert!(!hidden.participant("bob").unwrap().voted);

        board.reveal().unwrap();
        let shown = board.snapshot();
        assert_eq!(shown.participant("alice").unwrap().vote, Some(3));
        assert_eq!(shown.participant("bob").unwrap().vote, None);
    }

    #[test]
    fn test_reveal_requires_a_vote() {
        let mut board = Board::new("1");
        assert!(matches!(board.reveal(), Err(AppError::EmptyBoard)));

        board.connect("alice");
        board.submit_vote("alice", Vote::Abstain).unwrap();
        assert!(matches!(board.reveal(), Err(AppError::EmptyBoard)));
        assert_eq!(board.phase(), Phase::Open);
    }

    #[test]
    fn test_repeated_reveal_is_rejected_without_change() {
        let mut board = board_with_votes(&[("alice", Vote::Estimate(5))]);
        board.reveal().unwrap();
        let revealed = board.snapshot();

        for _ in 0..3 {
            assert!(matches!(
                board.reveal(),
                Err(AppError::InvalidState { phase: "revealed" })
            ));
            assert_eq!(board.snapshot(), revealed);
        }
    }

    #[test]
    fn test_vote_rejected_while_revealed() {
        let mut board = board_with_votes(&[("alice", Vote::Estimate(5))]);
        board.reveal().unwrap();

        let err = board.submit_vote("alice", Vote::Estimate(8)).unwrap_err();
        assert!(matches!(err, AppError::InvalidState { .. }));
        assert_eq!(board.participant("alice").unwrap().vote, Vote::Estimate(5));

        // unseen names are not provisioned by a rejected vote either
        assert!(board.submit_vote("carol", Vote::Estimate(1)).is_err());
        assert!(board.participant("carol").is_none());
    }

    #[test]
    fn test_reset_clears_votes() {
        let mut board = board_with_votes(&[
            ("alice", Vote::Estimate(3)),
            ("bob", Vote::Estimate(5)),
        ]);
        board.reveal().unwrap();
        board.reset().unwrap();

        let snapshot = board.snapshot();
        assert!(!snapshot.voting_complete);
        assert!(snapshot.stats.is_none());
        assert_eq!(snapshot.participants.len(), 2);
        assert!(snapshot.participants.iter().all(|p| !p.voted && p.vote.is_none()));
        assert_eq!(board.participant("alice").unwrap().vote, Vote::Abstain);
    }

    #[test]
    fn test_reset_requires_revealed() {
        let mut board = board_with_votes(&[("alice", Vote::Estimate(3))]);
        assert!(matches!(
            board.reset(),
            Err(AppError::InvalidState { phase: "open" })
        ));
        assert_eq!(board.participant("alice").unwrap().vote, Vote::Estimate(3));
    }

    #[test]
    fn test_single_vote_histogram() {
        let mut board = board_with_votes(&[("alice", Vote::Estimate(5))]);
        board.reveal().unwrap();

        let stats = board.snapshot().stats.unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.histogram.len(), 1);
        assert_eq!(stats.histogram.get(&5), Some(&1));
    }

    #[test]
    fn test_stats_on_reveal() {
        let mut board = board_with_votes(&[
            ("alice", Vote::Estimate(3)),
            ("bob", Vote::Estimate(5)),
            ("carol", Vote::Abstain),
        ]);
        board.reveal().unwrap();

        let stats = board.snapshot().stats.unwrap();
        assert_eq!(stats.count, 2);
        assert!((stats.mean - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_connection_counting() {
        let mut board = Board::new("1");
        board.connect("alice");
        board.connect("alice");
        assert!(board.participant("alice").unwrap().connected());

        assert!(!board.disconnect("alice"));
        assert!(board.participant("alice").unwrap().connected());

        assert!(board.disconnect("alice"));
        assert!(!board.participant("alice").unwrap().connected());

        // extra disconnects and unknown names are ignored
        assert!(!board.disconnect("alice"));
        assert!(!board.disconnect("nobody"));
        assert!(board.participant("nobody").is_none());
    }

    #[test]
    fn test_disconnect_keeps_vote() {
        let mut board = Board::new("1");
        board.connect("alice");
        board.submit_vote("alice", Vote::Estimate(8)).unwrap();
        board.disconnect("alice");

        let snapshot = board.snapshot();
        let alice = snapshot.participant("alice").unwrap();
        assert!(alice.voted);
        assert!(!alice.connected);

        board.reveal().unwrap();
        assert_eq!(board.snapshot().stats.unwrap().count, 1);
    }

    #[test]
    fn test_snapshot_sorted_by_name() {
        let board = board_with_votes(&[
            ("zoe", Vote::Abstain),
            ("alice", Vote::Abstain),
            ("mike", Vote::Abstain),
        ]);
        let names: Vec<_> = board
            .snapshot()
            .participants
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, ["alice", "mike", "zoe"]);
    }

    #[test]
    fn test_apply_dispatches_commands() {
        let mut board = Board::new("1");
        board
            .apply(BoardCommand::SubmitVote {
                name: "alice".to_string(),
                vote: Vote::Estimate(13),
            })
            .unwrap();
        board.apply(BoardCommand::Reveal).unwrap();
        assert_eq!(board.phase(), Phase::Revealed);
        board.apply(BoardCommand::Reset).unwrap();
        assert_eq!(board.phase(), Phase::Open);
    }
}
