//! Engine settings, usually read from the `[engine]` table of a TOML file.

use crate::battle::BattleType;
use crate::implied::DEFAULT_AUDIT_LOG_CAPACITY;
use crate::progression::{DEFAULT_MILESTONES, DEFAULT_MILESTONE_INTERVAL};
use crate::refinement::DEFAULT_OPPONENT_COUNT;
use crate::selector::DEFAULT_RECENT_WINDOW;
use crate::trueskill::RatingParams;
use serde::{Deserialize, Serialize};

/// Settings for a [`RankingEngine`](crate::RankingEngine).
///
/// Every field has a default, so an empty table yields a working engine.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Battle format used until changed. Defaults to pairs.
    #[serde(default)]
    pub battle_type: BattleType,
    /// Battle counts that pause for a ranking review.
    #[serde(default = "default_milestones")]
    pub milestones: Vec<u32>,
    /// Spacing of further milestones past the last listed one. 0 disables.
    #[serde(default = "default_milestone_interval")]
    pub milestone_interval: u32,
    /// Opponents drawn for a flagged candidate.
    #[serde(default = "default_refinement_opponents")]
    pub refinement_opponents: usize,
    /// Ids remembered to avoid showing the same candidates again soon.
    #[serde(default = "default_recent_window")]
    pub recent_window: usize,
    /// Implied battles kept in the audit log.
    #[serde(default = "default_audit_log_capacity")]
    pub audit_log_capacity: usize,
    /// Keep the previous battle's participants out of the next one when the
    /// pool allows.
    #[serde(default = "default_exclude_last")]
    pub exclude_last_participants: bool,
    /// Seed for battle selection. Random when unset.
    #[serde(default)]
    pub rng_seed: Option<u64>,
    #[serde(default)]
    pub rating: RatingParams,
}

fn default_milestones() -> Vec<u32> {
    DEFAULT_MILESTONES.to_vec()
}

fn default_milestone_interval() -> u32 {
    DEFAULT_MILESTONE_INTERVAL
}

fn default_refinement_opponents() -> usize {
    DEFAULT_OPPONENT_COUNT
}

fn default_recent_window() -> usize {
    DEFAULT_RECENT_WINDOW
}

fn default_audit_log_capacity() -> usize {
    DEFAULT_AUDIT_LOG_CAPACITY
}

fn default_exclude_last() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            battle_type: BattleType::default(),
            milestones: default_milestones(),
            milestone_interval: default_milestone_interval(),
            refinement_opponents: default_refinement_opponents(),
            recent_window: default_recent_window(),
            audit_log_capacity: default_audit_log_capacity(),
            exclude_last_participants: default_exclude_last(),
            rng_seed: None,
            rating: RatingParams::default(),
        }
    }
}
