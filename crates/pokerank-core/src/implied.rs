//! Implied battles: synthetic outcomes inferred from a manual reorder.
//!
//! Moving candidate X to index `p` of an ordered list yields, in order:
//!
//! | step | neighbor | outcome      | times |
//! |------|----------|--------------|-------|
//! | 1    | `p - 1`  | neighbor wins | 2    |
//! | 2    | `p - 2`  | neighbor wins | 1    |
//! | 3    | `p + 1`  | X wins        | 2    |
//! | 4    | `p + 2`  | X wins        | 1    |
//!
//! Neighbors above always beat X and neighbors below always lose to it,
//! whatever the direction or distance of the move.

use crate::candidate::CandidateId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use thiserror::Error;

/// Default number of entries kept by [`ImpliedBattleLog`].
pub const DEFAULT_AUDIT_LOG_CAPACITY: usize = 256;

/// Which neighbor slot produced an implied battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NeighborCategory {
    Above1,
    Above2,
    Below1,
    Below2,
}

impl NeighborCategory {
    /// Evaluation order of the neighbor rule.
    pub const ALL: [NeighborCategory; 4] = [
        NeighborCategory::Above1,
        NeighborCategory::Above2,
        NeighborCategory::Below1,
        NeighborCategory::Below2,
    ];

    /// How many times the outcome is applied.
    #[inline]
    pub const fn frequency(self) -> usize {
        match self {
            NeighborCategory::Above1 | NeighborCategory::Below1 => 2,
            NeighborCategory::Above2 | NeighborCategory::Below2 => 1,
        }
    }

    /// Returns true if the neighbor sits above the moved candidate.
    #[inline]
    pub const fn is_above(self) -> bool {
        matches!(self, NeighborCategory::Above1 | NeighborCategory::Above2)
    }

    /// Neighbor index relative to `p`, or `None` when it falls off the list.
    fn neighbor_index(self, p: usize, len: usize) -> Option<usize> {
        let index = match self {
            NeighborCategory::Above1 => p.checked_sub(1)?,
            NeighborCategory::Above2 => p.checked_sub(2)?,
            NeighborCategory::Below1 => p + 1,
            NeighborCategory::Below2 => p + 2,
        };
        (index < len).then_some(index)
    }

    /// Short label used in outcome records.
    pub const fn as_str(self) -> &'static str {
        match self {
            NeighborCategory::Above1 => "above1",
            NeighborCategory::Above2 => "above2",
            NeighborCategory::Below1 => "below1",
            NeighborCategory::Below2 => "below2",
        }
    }
}

impl fmt::Display for NeighborCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One synthetic pairwise outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImpliedBattle {
    pub winner: CandidateId,
    pub loser: CandidateId,
    pub category: NeighborCategory,
}

/// Reasons a reorder is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReorderError {
    /// The ordered list is empty.
    #[error("ordered list is empty")]
    EmptyList,
    /// The target index is past the end of the list.
    #[error("index {index} out of range for list of {len}")]
    IndexOutOfRange { index: usize, len: usize },
    /// The moved candidate does not appear in the list.
    #[error("candidate {0} is not in the ordered list")]
    CandidateNotInList(CandidateId),
    /// The list contains a candidate more than once.
    #[error("candidate {0} appears more than once in the ordered list")]
    DuplicateCandidate(CandidateId),
}

/// Returns the list after the move, with `candidate` at `new_index`.
///
/// `ordered_ids` may already be the post-move order. Otherwise it is taken as
/// the pre-move order and the move is applied to it.
pub fn resolve_order(
    candidate: CandidateId,
    new_index: usize,
    ordered_ids: &[CandidateId],
) -> Result<Vec<CandidateId>, ReorderError> {
    let len = ordered_ids.len();
    if len == 0 {
        return Err(ReorderError::EmptyList);
    }
    if new_index >= len {
        return Err(ReorderError::IndexOutOfRange {
            index: new_index,
            len,
        });
    }

    let mut seen = HashSet::with_capacity(len);
    for &id in ordered_ids {
        if !seen.insert(id) {
            return Err(ReorderError::DuplicateCandidate(id));
        }
    }

    let from = ordered_ids
        .iter()
        .position(|&id| id == candidate)
        .ok_or(ReorderError::CandidateNotInList(candidate))?;

    let mut order = ordered_ids.to_vec();
    if from != new_index {
        let moved = order.remove(from);
        order.insert(new_index, moved);
    }
    Ok(order)
}

/// Infers the ordered sequence of implied battles for a reorder.
///
/// Frequencies are expanded, so `above1` appears twice in a row. The
/// function is pure; the caller applies the outcomes one by one.
///
/// # Errors
///
/// Returns a [`ReorderError`] if the index is out of range, the candidate is
/// missing from the list, or the list contains duplicates.
pub fn infer(
    candidate: CandidateId,
    new_index: usize,
    ordered_ids: &[CandidateId],
) -> Result<Vec<ImpliedBattle>, ReorderError> {
    let order = resolve_order(candidate, new_index, ordered_ids)?;
    let len = order.len();
    let mut battles = Vec::with_capacity(6);

    for category in NeighborCategory::ALL {
        let Some(index) = category.neighbor_index(new_index, len) else {
            continue;
        };
        let neighbor = order[index];
        if neighbor == candidate {
            continue;
        }
        let (winner, loser) = if category.is_above() {
            (neighbor, candidate)
        } else {
            (candidate, neighbor)
        };
        for _ in 0..category.frequency() {
            battles.push(ImpliedBattle {
                winner,
                loser,
                category,
            });
        }
    }

    Ok(battles)
}

/// One audit entry for an applied implied battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpliedLogEntry {
    pub sequence: u64,
    pub category: NeighborCategory,
    pub winner: CandidateId,
    pub loser: CandidateId,
    pub timestamp: DateTime<Utc>,
}

impl ImpliedLogEntry {
    /// Label in the form `category#sequence`.
    pub fn label(&self) -> String {
        format!("{}#{}", self.category, self.sequence)
    }
}

/// Bounded log of applied implied battles, for inspection and replay.
///
/// The sequence counter keeps running when old entries are evicted.
#[derive(Debug, Clone)]
pub struct ImpliedBattleLog {
    entries: VecDeque<ImpliedLogEntry>,
    capacity: usize,
    next_sequence: u64,
}

impl Default for ImpliedBattleLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_AUDIT_LOG_CAPACITY)
    }
}

impl ImpliedBattleLog {
    /// Creates a log holding at most `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            next_sequence: 1,
        }
    }

    /// Appends an entry and returns a copy of it.
    pub fn record(&mut self, battle: &ImpliedBattle) -> ImpliedLogEntry {
        let entry = ImpliedLogEntry {
            sequence: self.next_sequence,
            category: battle.category,
            winner: battle.winner,
            loser: battle.loser,
            timestamp: Utc::now(),
        };
        self.next_sequence += 1;

        if self.capacity > 0 {
            if self.entries.len() == self.capacity {
                self.entries.pop_front();
            }
            self.entries.push_back(entry.clone());
        }
        entry
    }

    /// Entries currently retained, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &ImpliedLogEntry> {
        self.entries.iter()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entries are retained.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sequence number the next entry will receive.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Drops all entries and restarts the sequence counter.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_sequence = 1;
    }
}
