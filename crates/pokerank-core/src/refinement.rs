//! Queue of candidates flagged for extra validation battles.

use crate::candidate::CandidateId;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Opponents drawn per flagged candidate unless configured otherwise.
pub const DEFAULT_OPPONENT_COUNT: usize = 3;

/// A flagged candidate and the opponents it still has to face.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefinementEntry {
    pub candidate: CandidateId,
    pub opponents: Vec<CandidateId>,
    pub enqueued_at: DateTime<Utc>,
}

/// FIFO of refinement entries, at most one per candidate.
#[derive(Debug, Clone)]
pub struct RefinementQueue {
    entries: VecDeque<RefinementEntry>,
    opponent_count: usize,
}

impl Default for RefinementQueue {
    fn default() -> Self {
        Self::new(DEFAULT_OPPONENT_COUNT)
    }
}

impl RefinementQueue {
    /// Creates an empty queue drawing `opponent_count` opponents per entry.
    pub fn new(opponent_count: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            opponent_count,
        }
    }

    /// Flags a candidate. Opponents are drawn at random from `pool`,
    /// excluding the candidate; a small pool yields fewer (possibly zero).
    ///
    /// Returns false if the candidate was already queued.
    pub fn enqueue<R: Rng>(&mut self, id: CandidateId, pool: &[CandidateId], rng: &mut R) -> bool {
        if self.contains(id) {
            return false;
        }

        let mut others: Vec<CandidateId> = pool.iter().copied().filter(|&c| c != id).collect();
        others.sort_unstable();
        others.dedup();
        let opponents: Vec<CandidateId> = others
            .choose_multiple(rng, self.opponent_count)
            .copied()
            .collect();

        self.entries.push_back(RefinementEntry {
            candidate: id,
            opponents,
            enqueued_at: Utc::now(),
        });
        true
    }

    /// Pops the oldest entry.
    pub fn dequeue(&mut self) -> Option<RefinementEntry> {
        self.entries.pop_front()
    }

    /// Removes the oldest entry whose candidate passes `eligible` and returns
    /// it with its position. Entries that fail stay queued in order.
    pub fn take_first<F>(&mut self, mut eligible: F) -> Option<(usize, RefinementEntry)>
    where
        F: FnMut(CandidateId) -> bool,
    {
        let index = self.entries.iter().position(|e| eligible(e.candidate))?;
        self.entries.remove(index).map(|entry| (index, entry))
    }

    /// Puts a partially consumed entry back at `index`, or at the tail if the
    /// queue has shrunk below it.
    pub fn insert(&mut self, index: usize, entry: RefinementEntry) {
        if !self.contains(entry.candidate) {
            let index = index.min(self.entries.len());
            self.entries.insert(index, entry);
        }
    }

    /// Unflags a candidate. Returns true if it was queued.
    pub fn remove(&mut self, id: CandidateId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.candidate != id);
        self.entries.len() != before
    }

    pub fn contains(&self, id: CandidateId) -> bool {
        self.entries.iter().any(|e| e.candidate == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Head of the queue without removing it.
    pub fn peek(&self) -> Option<&RefinementEntry> {
        self.entries.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RefinementEntry> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Opponents drawn per entry.
    pub fn opponent_count(&self) -> usize {
        self.opponent_count
    }

    pub(crate) fn restore(&mut self, entries: Vec<RefinementEntry>) {
        self.entries.clear();
        for entry in entries {
            if !self.contains(entry.candidate) {
                self.entries.push_back(entry);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ids(range: std::ops::RangeInclusive<u32>) -> Vec<CandidateId> {
        range.map(CandidateId).collect()
    }

    #[test]
    fn test_enqueue_is_idempotent() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut queue = RefinementQueue::default();
        let pool = ids(1..=10);

        assert!(queue.enqueue(CandidateId(1), &pool, &mut rng));
        assert!(!queue.enqueue(CandidateId(1), &pool, &mut rng));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_opponents_are_distinct_and_exclude_candidate() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut queue = RefinementQueue::default();
        queue.enqueue(CandidateId(5), &ids(1..=10), &mut rng);

        let entry = queue.peek().unwrap();
        assert_eq!(entry.opponents.len(), DEFAULT_OPPONENT_COUNT);
        assert!(!entry.opponents.contains(&CandidateId(5)));
        let mut sorted = entry.opponents.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), entry.opponents.len());
    }

    #[test]
    fn test_small_pool_yields_fewer_opponents() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut queue = RefinementQueue::default();
        assert!(queue.enqueue(CandidateId(1), &ids(1..=2), &mut rng));
        assert!(queue.enqueue(CandidateId(9), &[CandidateId(9)], &mut rng));

        assert_eq!(queue.dequeue().unwrap().opponents, vec![CandidateId(2)]);
        assert!(queue.dequeue().unwrap().opponents.is_empty());
    }

    #[test]
    fn test_fifo_order() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut queue = RefinementQueue::default();
        let pool = ids(1..=8);
        for n in [4, 2, 6] {
            queue.enqueue(CandidateId(n), &pool, &mut rng);
        }
        let order: Vec<_> = std::iter::from_fn(|| queue.dequeue().map(|e| e.candidate)).collect();
        assert_eq!(order, vec![CandidateId(4), CandidateId(2), CandidateId(6)]);
    }

    #[test]
    fn test_remove_only_affects_target() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut queue = RefinementQueue::default();
        let pool = ids(1..=8);
        queue.enqueue(CandidateId(1), &pool, &mut rng);
        queue.enqueue(CandidateId(2), &pool, &mut rng);

        assert!(queue.remove(CandidateId(1)));
        assert!(!queue.remove(CandidateId(1)));
        assert_eq!(queue.len(), 1);
        assert!(!queue.contains(CandidateId(1)));
        assert!(queue.contains(CandidateId(2)));
    }

    #[test]
    fn test_insert_restores_position() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut queue = RefinementQueue::default();
        let pool = ids(1..=8);
        queue.enqueue(CandidateId(1), &pool, &mut rng);
        queue.enqueue(CandidateId(2), &pool, &mut rng);

        let head = queue.dequeue().unwrap();
        queue.insert(0, head.clone());
        assert_eq!(queue.peek(), Some(&head));

        queue.insert(0, head);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_take_first_skips_ineligible_entries() {
        let mut rng = StdRng::seed_from_u64(13);
        let mut queue = RefinementQueue::default();
        let pool = ids(1..=8);
        for n in [1, 2, 3] {
            queue.enqueue(CandidateId(n), &pool, &mut rng);
        }

        let (index, entry) = queue.take_first(|id| id != CandidateId(1)).unwrap();
        assert_eq!((index, entry.candidate), (1, CandidateId(2)));
        let order: Vec<_> = queue.iter().map(|e| e.candidate).collect();
        assert_eq!(order, vec![CandidateId(1), CandidateId(3)]);

        queue.insert(index, entry);
        let order: Vec<_> = queue.iter().map(|e| e.candidate).collect();
        assert_eq!(order, ids(1..=3));

        assert!(queue.take_first(|id| id == CandidateId(9)).is_none());
        assert_eq!(queue.len(), 3);
    }
}
