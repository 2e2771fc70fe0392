//! Preference ranking engine.
//!
//! Candidates gain Gaussian skill ratings from two kinds of evidence:
//! - explicit battles, where a user picks favourites out of a pair or triplet
//! - manual reorders of the ranking list, which imply battles with neighbours
//!
//! [`RankingEngine`] ties together the rating store, battle selection,
//! milestone progression, the refinement queue and ranking snapshots.

mod battle;
mod candidate;
mod config;
mod engine;
mod events;
mod implied;
mod outcome;
mod persist;
mod progression;
mod rating;
mod refinement;
mod selector;
mod snapshot;
mod store;
pub mod trueskill;

pub use battle::{decompose, BattleError, BattleType, ParseBattleTypeError};
pub use candidate::{Candidate, CandidateId, CandidatePool, PoolError};
pub use config::EngineConfig;
pub use engine::{BattleReport, EngineError, RankingEngine};
pub use events::{EngineEvent, EngineObserver};
pub use implied::{
    infer, resolve_order, ImpliedBattle, ImpliedBattleLog, ImpliedLogEntry, NeighborCategory,
    ReorderError, DEFAULT_AUDIT_LOG_CAPACITY,
};
pub use outcome::{BattleOutcome, OutcomeSource};
pub use persist::{PersistedCandidate, PersistedState};
pub use progression::{
    ProgressionController, ProgressionError, ProgressionState, DEFAULT_MILESTONES,
    DEFAULT_MILESTONE_INTERVAL,
};
pub use rating::{BattleStat, Rating, DEFAULT_MU, DEFAULT_SIGMA};
pub use refinement::{RefinementEntry, RefinementQueue, DEFAULT_OPPONENT_COUNT};
pub use selector::{BattleSelector, SelectionError, DEFAULT_RECENT_WINDOW};
pub use snapshot::{
    compute_rankings, ranking_order, MilestoneSnapshot, RankingEntry, RankingSnapshotter,
};
pub use store::RatingStore;
pub use trueskill::RatingParams;
