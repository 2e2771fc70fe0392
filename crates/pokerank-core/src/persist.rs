//! Serializable image of the engine state, used by storage adapters.

use crate::battle::BattleType;
use crate::candidate::CandidateId;
use crate::outcome::BattleOutcome;
use crate::rating::{BattleStat, Rating};
use crate::refinement::RefinementEntry;
use crate::snapshot::MilestoneSnapshot;
use serde::{Deserialize, Serialize};

/// Rating and counters of one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersistedCandidate {
    pub id: CandidateId,
    pub mu: f64,
    pub sigma: f64,
    pub battle_count: u32,
    pub wins: u32,
    pub losses: u32,
}

impl PersistedCandidate {
    pub fn new(id: CandidateId, rating: Rating, stats: BattleStat) -> Self {
        Self {
            id,
            mu: rating.mu(),
            sigma: rating.sigma(),
            battle_count: stats.battle_count,
            wins: stats.wins,
            losses: stats.losses,
        }
    }

    pub fn rating(&self) -> Rating {
        Rating::new(self.mu, self.sigma)
    }

    pub fn stats(&self) -> BattleStat {
        BattleStat {
            battle_count: self.battle_count,
            wins: self.wins,
            losses: self.losses,
        }
    }
}

/// Everything needed to resume a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub candidates: Vec<PersistedCandidate>,
    pub total_battles: u32,
    pub outcome_history: Vec<BattleOutcome>,
    pub milestone_list: Vec<MilestoneSnapshot>,
    pub refinement_queue: Vec<RefinementEntry>,
    /// A milestone at `total_battles` has not been continued yet.
    #[serde(default)]
    pub review_pending: bool,
    #[serde(default)]
    pub battle_type: BattleType,
}
