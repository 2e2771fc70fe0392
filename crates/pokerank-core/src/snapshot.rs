//! Ranking views derived from the rating store, and frozen milestone copies.

use crate::candidate::{Candidate, CandidateId, CandidatePool};
use crate::rating::BattleStat;
use crate::store::RatingStore;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One row of a computed ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct RankingEntry {
    pub id: CandidateId,
    /// Catalog metadata, if the candidate is in the pool.
    pub candidate: Option<Candidate>,
    /// Conservative score `mu - 3 * sigma`.
    pub score: f64,
    /// Confidence in percent.
    pub confidence: f64,
    pub mu: f64,
    pub sigma: f64,
    pub stats: BattleStat,
}

impl RankingEntry {
    /// Display name, falling back to the id.
    pub fn display_name(&self) -> String {
        self.candidate
            .as_ref()
            .map_or_else(|| self.id.to_string(), |c| c.name.clone())
    }
}

/// Ranking order: score descending, then id ascending.
fn ranking_cmp(a_score: f64, a_id: CandidateId, b_score: f64, b_id: CandidateId) -> Ordering {
    b_score.total_cmp(&a_score).then(a_id.cmp(&b_id))
}

/// Computes the full ranking from the store.
pub fn compute_rankings(store: &RatingStore, pool: &CandidatePool) -> Vec<RankingEntry> {
    let mut entries: Vec<RankingEntry> = store
        .iter()
        .map(|(id, rating, stats)| RankingEntry {
            id,
            candidate: pool.get(id).cloned(),
            score: rating.conservative_score(),
            confidence: rating.confidence(),
            mu: rating.mu(),
            sigma: rating.sigma(),
            stats,
        })
        .collect();
    entries.sort_by(|a, b| ranking_cmp(a.score, a.id, b.score, b.id));
    entries
}

/// Ranked ids in ranking order.
pub fn ranking_order(store: &RatingStore) -> Vec<CandidateId> {
    let mut scored: Vec<(CandidateId, f64)> = store
        .iter()
        .map(|(id, rating, _)| (id, rating.conservative_score()))
        .collect();
    scored.sort_by(|a, b| ranking_cmp(a.1, a.0, b.1, b.0));
    scored.into_iter().map(|(id, _)| id).collect()
}

/// Ranking order frozen at a battle count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneSnapshot {
    battle_count: u32,
    ordered_ids: Vec<CandidateId>,
}

impl MilestoneSnapshot {
    /// Creates a snapshot from an already ordered id list.
    pub fn new(battle_count: u32, ordered_ids: Vec<CandidateId>) -> Self {
        Self {
            battle_count,
            ordered_ids,
        }
    }

    /// Battle count at capture time.
    pub fn battle_count(&self) -> u32 {
        self.battle_count
    }

    /// Ids in ranking order at capture time.
    pub fn ordered_ids(&self) -> &[CandidateId] {
        &self.ordered_ids
    }

    /// 1-based rank of a candidate in this snapshot.
    pub fn rank_of(&self, id: CandidateId) -> Option<usize> {
        self.ordered_ids.iter().position(|&x| x == id).map(|i| i + 1)
    }
}

/// Computes rankings on demand and keeps the milestone snapshots.
#[derive(Debug, Clone, Default)]
pub struct RankingSnapshotter {
    snapshots: Vec<MilestoneSnapshot>,
}

impl RankingSnapshotter {
    pub fn new() -> Self {
        Self::default()
    }

    /// See [`compute_rankings`].
    pub fn compute_rankings(&self, store: &RatingStore, pool: &CandidatePool) -> Vec<RankingEntry> {
        compute_rankings(store, pool)
    }

    /// Freezes the current order under `battle_count`, replacing any earlier
    /// snapshot taken at the same count.
    pub fn capture_snapshot(&mut self, store: &RatingStore, battle_count: u32) -> &MilestoneSnapshot {
        let snapshot = MilestoneSnapshot::new(battle_count, ranking_order(store));
        self.snapshots.retain(|s| s.battle_count != battle_count);
        let at = self
            .snapshots
            .partition_point(|s| s.battle_count < battle_count);
        self.snapshots.insert(at, snapshot);
        &self.snapshots[at]
    }

    /// Returns the snapshot captured at `battle_count`.
    pub fn get_snapshot(&self, battle_count: u32) -> Option<&MilestoneSnapshot> {
        self.snapshots
            .iter()
            .find(|s| s.battle_count == battle_count)
    }

    /// All snapshots, ordered by battle count.
    pub fn snapshots(&self) -> &[MilestoneSnapshot] {
        &self.snapshots
    }

    /// Most recent snapshot.
    pub fn latest(&self) -> Option<&MilestoneSnapshot> {
        self.snapshots.last()
    }

    /// Drops the snapshot at `battle_count`, if any.
    pub fn discard(&mut self, battle_count: u32) -> bool {
        let before = self.snapshots.len();
        self.snapshots.retain(|s| s.battle_count != battle_count);
        self.snapshots.len() != before
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    pub(crate) fn restore(&mut self, mut snapshots: Vec<MilestoneSnapshot>) {
        snapshots.sort_by_key(|s| s.battle_count);
        snapshots.dedup_by_key(|s| s.battle_count);
        self.snapshots = snapshots;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::BattleOutcome;

    fn id(n: u32) -> CandidateId {
        CandidateId(n)
    }

    fn store_with_battles() -> RatingStore {
        let mut store = RatingStore::default();
        store.apply(BattleOutcome::explicit(id(3), id(1), 1));
        store.apply(BattleOutcome::explicit(id(3), id(2), 2));
        store.apply(BattleOutcome::explicit(id(2), id(1), 3));
        store
    }

    #[test]
    fn test_rankings_sorted_by_score() {
        let store = store_with_battles();
        let pool = CandidatePool::new(vec![Candidate::new(3, "Venusaur")]).unwrap();
        let rankings = compute_rankings(&store, &pool);

        assert_eq!(rankings.len(), 3);
        assert_eq!(rankings[0].id, id(3));
        assert_eq!(rankings[0].display_name(), "Venusaur");
        assert_eq!(rankings[2].display_name(), "#1");
        assert!(rankings.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_ties_break_by_id() {
        let mut store = RatingStore::default();
        for n in [9, 4, 7] {
            store.get_or_init(id(n));
        }
        assert_eq!(ranking_order(&store), vec![id(4), id(7), id(9)]);
    }

    #[test]
    fn test_order_matches_rankings() {
        let store = store_with_battles();
        let pool = CandidatePool::default();
        let ids: Vec<_> = compute_rankings(&store, &pool).iter().map(|e| e.id).collect();
        assert_eq!(ids, ranking_order(&store));
    }

    #[test]
    fn test_snapshot_is_frozen() {
        let mut store = store_with_battles();
        let mut snapshotter = RankingSnapshotter::new();
        let captured = snapshotter.capture_snapshot(&store, 3).clone();

        for n in 0..10 {
            store.apply(BattleOutcome::explicit(id(1), id(3), 4 + n));
        }

        assert_eq!(snapshotter.get_snapshot(3), Some(&captured));
        assert_ne!(captured.ordered_ids(), ranking_order(&store).as_slice());
        assert_eq!(captured.rank_of(id(3)), Some(1));
    }

    #[test]
    fn test_snapshots_kept_in_count_order() {
        let store = store_with_battles();
        let mut snapshotter = RankingSnapshotter::new();
        snapshotter.capture_snapshot(&store, 25);
        snapshotter.capture_snapshot(&store, 10);
        snapshotter.capture_snapshot(&store, 25);

        let counts: Vec<_> = snapshotter.snapshots().iter().map(|s| s.battle_count()).collect();
        assert_eq!(counts, vec![10, 25]);
        assert_eq!(snapshotter.latest().unwrap().battle_count(), 25);

        assert!(snapshotter.discard(10));
        assert!(!snapshotter.discard(10));
        assert!(snapshotter.get_snapshot(10).is_none());
    }
}
