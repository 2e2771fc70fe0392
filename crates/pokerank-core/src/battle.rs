//! Battle formats and decomposition of a battle result into outcomes.

use crate::candidate::CandidateId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of candidates shown per battle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BattleType {
    /// Two candidates, one winner.
    #[default]
    Pairs,
    /// Three candidates.
    Triplets,
}

impl BattleType {
    /// Participants per battle.
    #[inline]
    pub const fn size(self) -> usize {
        match self {
            BattleType::Pairs => 2,
            BattleType::Triplets => 3,
        }
    }
}

impl fmt::Display for BattleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BattleType::Pairs => write!(f, "pairs"),
            BattleType::Triplets => write!(f, "triplets"),
        }
    }
}

/// Error returned when a battle type string is not recognised.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown battle type '{0}' (expected 'pairs' or 'triplets')")]
pub struct ParseBattleTypeError(String);

impl FromStr for BattleType {
    type Err = ParseBattleTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pairs" | "pair" | "2" => Ok(BattleType::Pairs),
            "triplets" | "triplet" | "3" => Ok(BattleType::Triplets),
            _ => Err(ParseBattleTypeError(s.to_string())),
        }
    }
}

/// Reasons a submitted battle result is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BattleError {
    #[error("{battle_type} battle needs {expected} participants, got {actual}")]
    WrongParticipantCount {
        battle_type: BattleType,
        expected: usize,
        actual: usize,
    },
    #[error("participant {0} appears more than once")]
    DuplicateParticipant(CandidateId),
    #[error("candidate {0} is not in the pool")]
    UnknownCandidate(CandidateId),
    #[error("winner {0} did not take part in the battle")]
    WinnerNotParticipant(CandidateId),
    #[error("battle result names no winner")]
    NoWinner,
    #[error("every participant was marked as a winner")]
    NoLoser,
    #[error("a pair battle has exactly one winner, got {0}")]
    TooManyWinners(usize),
}

/// Splits a battle result into `(winner, loser)` pairs: every winner beats
/// every non-winner, in participant order.
///
/// # Errors
///
/// Returns a [`BattleError`] when the participant count does not match the
/// battle type, participants repeat, or the winner set is empty, foreign, or
/// covers every participant.
pub fn decompose(
    battle_type: BattleType,
    participants: &[CandidateId],
    winners: &[CandidateId],
) -> Result<Vec<(CandidateId, CandidateId)>, BattleError> {
    let expected = battle_type.size();
    if participants.len() != expected {
        return Err(BattleError::WrongParticipantCount {
            battle_type,
            expected,
            actual: participants.len(),
        });
    }

    let mut seen = HashSet::with_capacity(expected);
    for &id in participants {
        if !seen.insert(id) {
            return Err(BattleError::DuplicateParticipant(id));
        }
    }

    let mut winner_set = HashSet::with_capacity(winners.len());
    for &id in winners {
        if !seen.contains(&id) {
            return Err(BattleError::WinnerNotParticipant(id));
        }
        winner_set.insert(id);
    }
    if winner_set.is_empty() {
        return Err(BattleError::NoWinner);
    }
    if winner_set.len() == participants.len() {
        return Err(BattleError::NoLoser);
    }
    if battle_type == BattleType::Pairs && winner_set.len() > 1 {
        return Err(BattleError::TooManyWinners(winner_set.len()));
    }

    let ordered_winners = participants.iter().filter(|id| winner_set.contains(*id));
    let losers: Vec<CandidateId> = participants
        .iter()
        .copied()
        .filter(|id| !winner_set.contains(id))
        .collect();

    Ok(ordered_winners
        .flat_map(|&w| losers.iter().map(move |&l| (w, l)))
        .collect())
}
