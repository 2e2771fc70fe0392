//! The owned engine that every presentation surface drives.

use crate::battle::{self, BattleError, BattleType};
use crate::candidate::{Candidate, CandidateId, CandidatePool};
use crate::config::EngineConfig;
use crate::events::{EngineEvent, EngineObserver};
use crate::implied::{self, ImpliedBattleLog, ReorderError};
use crate::outcome::{BattleOutcome, OutcomeSource};
use crate::persist::{PersistedCandidate, PersistedState};
use crate::progression::{ProgressionController, ProgressionError, ProgressionState};
use crate::refinement::RefinementQueue;
use crate::selector::{BattleSelector, SelectionError};
use crate::snapshot::{MilestoneSnapshot, RankingEntry, RankingSnapshotter};
use crate::store::RatingStore;
use rand::rngs::StdRng;
use rand::SeedableRng;
use thiserror::Error;

/// Errors returned by [`RankingEngine`] operations.
#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error(transparent)]
    Battle(#[from] BattleError),
    #[error(transparent)]
    Reorder(#[from] ReorderError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error("milestone review at {battle_count} battles must be continued first")]
    MilestoneReviewPending { battle_count: u32 },
    #[error("no milestone review is pending")]
    NotInMilestoneReview,
    #[error("no battle to undo")]
    NothingToUndo,
}

impl From<ProgressionError> for EngineError {
    fn from(err: ProgressionError) -> Self {
        match err {
            ProgressionError::MilestoneReviewPending { battle_count } => {
                EngineError::MilestoneReviewPending { battle_count }
            }
            ProgressionError::NotInMilestoneReview => EngineError::NotInMilestoneReview,
            ProgressionError::NoBattlesRecorded => EngineError::NothingToUndo,
        }
    }
}

/// Result of an accepted battle.
#[derive(Debug, Clone, PartialEq)]
pub struct BattleReport {
    pub battle_number: u32,
    pub outcomes: Vec<BattleOutcome>,
    /// Set when this battle reached a milestone.
    pub milestone: Option<u32>,
}

/// Ratings, progression, refinement queue and snapshots for one session.
///
/// All mutation goes through `&mut self`, so each operation completes before
/// any reader can look at the rankings again.
pub struct RankingEngine {
    config: EngineConfig,
    pool: CandidatePool,
    category: Option<u32>,
    battle_type: BattleType,
    store: RatingStore,
    snapshots: RankingSnapshotter,
    progression: ProgressionController,
    selector: BattleSelector,
    queue: RefinementQueue,
    implied_log: ImpliedBattleLog,
    rng: StdRng,
    observers: Vec<Box<dyn EngineObserver>>,
}

impl RankingEngine {
    pub fn new(config: EngineConfig, pool: CandidatePool) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
            None => StdRng::from_entropy(),
        };
        Self {
            pool,
            category: None,
            battle_type: config.battle_type,
            store: RatingStore::new(config.rating),
            snapshots: RankingSnapshotter::new(),
            progression: ProgressionController::new(
                config.milestones.clone(),
                config.milestone_interval,
            ),
            selector: BattleSelector::new(config.rng_seed, config.recent_window),
            queue: RefinementQueue::new(config.refinement_opponents),
            implied_log: ImpliedBattleLog::with_capacity(config.audit_log_capacity),
            rng,
            observers: Vec::new(),
            config,
        }
    }

    /// Rebuilds an engine from persisted state.
    pub fn from_persisted(config: EngineConfig, pool: CandidatePool, state: PersistedState) -> Self {
        let mut engine = Self::new(config, pool);
        for candidate in &state.candidates {
            engine
                .store
                .restore(candidate.id, candidate.rating(), candidate.stats());
        }
        engine.store.restore_history(state.outcome_history);
        engine.snapshots.restore(state.milestone_list);
        engine.queue.restore(state.refinement_queue);
        engine
            .progression
            .restore(state.total_battles, state.review_pending);
        engine.battle_type = state.battle_type;
        tracing::info!(
            "Restored {} ratings at {} battles",
            engine.store.len(),
            engine.progression.total_battles()
        );
        engine
    }

    /// Captures the state for persistence.
    pub fn to_persisted(&self) -> PersistedState {
        PersistedState {
            candidates: self
                .store
                .iter()
                .map(|(id, rating, stats)| PersistedCandidate::new(id, rating, stats))
                .collect(),
            total_battles: self.progression.total_battles(),
            outcome_history: self.store.history().to_vec(),
            milestone_list: self.snapshots.snapshots().to_vec(),
            refinement_queue: self.queue.iter().cloned().collect(),
            review_pending: self.progression.is_in_review(),
            battle_type: self.battle_type,
        }
    }

    /// Registers an observer for engine events.
    pub fn subscribe<O: EngineObserver + 'static>(&mut self, observer: O) {
        self.observers.push(Box::new(observer));
    }

    fn emit(&mut self, event: EngineEvent) {
        for observer in &mut self.observers {
            observer.on_event(&event);
        }
    }

    /// Records an explicit battle.
    ///
    /// Every winner beats every non-winner once. When the new count is a
    /// milestone the ranking is frozen and the engine waits in review.
    ///
    /// # Errors
    ///
    /// Fails while a milestone review is pending, and for malformed results
    /// (see [`BattleError`]). Nothing changes on error.
    pub fn submit_battle_result(
        &mut self,
        battle_type: BattleType,
        participants: &[CandidateId],
        winners: &[CandidateId],
    ) -> Result<BattleReport, EngineError> {
        self.progression.ensure_battling()?;
        let pairs = battle::decompose(battle_type, participants, winners)?;
        if let Some(&unknown) = participants.iter().find(|&&id| !self.pool.contains(id)) {
            return Err(BattleError::UnknownCandidate(unknown).into());
        }

        let battle_number = self.progression.record_battle()?;
        let outcomes: Vec<BattleOutcome> = pairs
            .into_iter()
            .map(|(winner, loser)| BattleOutcome::explicit(winner, loser, battle_number))
            .collect();
        for outcome in &outcomes {
            self.store.apply(outcome.clone());
        }
        tracing::info!(
            "Recorded {} battle {} ({} outcomes)",
            battle_type,
            battle_number,
            outcomes.len()
        );

        let milestone = match self.progression.state() {
            ProgressionState::MilestoneReview { battle_count } => {
                self.snapshots.capture_snapshot(&self.store, battle_count);
                Some(battle_count)
            }
            _ => None,
        };

        self.emit(EngineEvent::BattleRecorded {
            battle_number,
            outcomes: outcomes.clone(),
        });
        if let Some(battle_count) = milestone {
            self.emit(EngineEvent::MilestoneReached { battle_count });
        }

        Ok(BattleReport {
            battle_number,
            outcomes,
            milestone,
        })
    }

    /// Applies a manual move of `candidate` to `new_index` as implied battles
    /// and returns the updated ranking.
    ///
    /// `ordered_ids` is the full ranking list, either before or after the
    /// move. Accepted in every progression state; the battle count is not
    /// touched.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Reorder`] for an invalid move. The error is
    /// logged and no rating changes.
    pub fn submit_manual_reorder(
        &mut self,
        candidate: CandidateId,
        new_index: usize,
        ordered_ids: &[CandidateId],
    ) -> Result<Vec<RankingEntry>, EngineError> {
        let implied = match implied::infer(candidate, new_index, ordered_ids) {
            Ok(implied) => implied,
            Err(err) => {
                tracing::warn!("Rejected reorder of {} to {}: {}", candidate, new_index, err);
                return Err(err.into());
            }
        };

        for battle in &implied {
            let entry = self.implied_log.record(battle);
            self.store
                .apply(BattleOutcome::implied(battle.winner, battle.loser, entry.label()));
        }
        tracing::info!(
            "Moved {} to position {} ({} implied battles)",
            candidate,
            new_index,
            implied.len()
        );

        self.emit(EngineEvent::ReorderApplied {
            candidate,
            new_index,
            implied,
        });
        Ok(self.get_rankings())
    }

    /// Flags a candidate for extra battles. Returns false if already flagged
    /// or not in the pool.
    pub fn enqueue_refinement(&mut self, id: CandidateId) -> bool {
        if !self.pool.contains(id) {
            tracing::warn!("Not flagging {}: not in the pool", id);
            return false;
        }
        let pool_ids: Vec<CandidateId> = self
            .pool
            .filtered(self.category)
            .iter()
            .map(|c| c.id)
            .collect();
        if !self.queue.enqueue(id, &pool_ids, &mut self.rng) {
            return false;
        }
        let opponents = self
            .queue
            .iter()
            .find(|entry| entry.candidate == id)
            .map(|entry| entry.opponents.clone())
            .unwrap_or_default();
        tracing::debug!("Queued {} for refinement against {:?}", id, opponents);
        self.emit(EngineEvent::RefinementQueued {
            candidate: id,
            opponents,
        });
        true
    }

    /// Unflags a candidate. Returns true if it was flagged.
    pub fn remove_refinement(&mut self, id: CandidateId) -> bool {
        let removed = self.queue.remove(id);
        if removed {
            self.emit(EngineEvent::RefinementRemoved { candidate: id });
        }
        removed
    }

    /// The current ranking, computed fresh from the ratings.
    pub fn get_rankings(&self) -> Vec<RankingEntry> {
        self.snapshots.compute_rankings(&self.store, &self.pool)
    }

    pub fn get_milestone_snapshot(&self, battle_count: u32) -> Option<&MilestoneSnapshot> {
        self.snapshots.get_snapshot(battle_count)
    }

    /// Leaves milestone review. Ratings are untouched.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotInMilestoneReview`] if no review is pending.
    pub fn continue_from_milestone(&mut self) -> Result<(), EngineError> {
        let battle_count = self.progression.continue_battles()?;
        tracing::info!("Continuing after milestone {}", battle_count);
        self.emit(EngineEvent::MilestoneContinued { battle_count });
        Ok(())
    }

    /// Clears ratings, history, snapshots, queue and counters.
    pub fn reset(&mut self) {
        self.progression.begin_reset();
        self.store.clear();
        self.snapshots.clear();
        self.queue.clear();
        self.implied_log.clear();
        self.selector.forget();
        self.progression.finish_reset();
        tracing::info!("Session reset");
        self.emit(EngineEvent::Reset);
    }

    /// Picks the participants of the next battle from the filtered pool.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Selection`] when no battle can be formed.
    pub fn next_battle(&mut self) -> Result<Vec<Candidate>, EngineError> {
        let pool = self.pool.filtered(self.category);
        let battle = self.selector.select_next(
            &pool,
            self.battle_type,
            self.config.exclude_last_participants,
            &mut self.queue,
        )?;
        Ok(battle)
    }

    /// Reverts the most recent explicit battle by replaying the history
    /// without it. Implied outcomes are kept. Returns the undone number.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NothingToUndo`] when no battle was recorded.
    pub fn undo_last_battle(&mut self) -> Result<u32, EngineError> {
        let battle_number = self.progression.rewind()?;
        let kept: Vec<BattleOutcome> = self
            .store
            .history()
            .iter()
            .filter(|o| !(o.source == OutcomeSource::Explicit && o.battle == Some(battle_number)))
            .cloned()
            .collect();
        self.store.rebuild(kept);
        self.snapshots.discard(battle_number);
        tracing::info!("Undid battle {}", battle_number);
        self.emit(EngineEvent::BattleUndone { battle_number });
        Ok(battle_number)
    }

    pub fn set_battle_type(&mut self, battle_type: BattleType) {
        self.battle_type = battle_type;
    }

    /// Limits selection and refinement opponents to one category.
    pub fn set_category_filter(&mut self, category: Option<u32>) {
        self.category = category;
        self.selector.forget();
    }

    pub fn battle_type(&self) -> BattleType {
        self.battle_type
    }

    pub fn category_filter(&self) -> Option<u32> {
        self.category
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn pool(&self) -> &CandidatePool {
        &self.pool
    }

    pub fn store(&self) -> &RatingStore {
        &self.store
    }

    pub fn state(&self) -> ProgressionState {
        self.progression.state()
    }

    pub fn total_battles(&self) -> u32 {
        self.progression.total_battles()
    }

    pub fn next_milestone(&self) -> Option<u32> {
        self.progression.next_milestone()
    }

    /// Fraction of the way to the next milestone.
    pub fn progress(&self) -> f64 {
        self.progression.progress()
    }

    pub fn snapshots(&self) -> &[MilestoneSnapshot] {
        self.snapshots.snapshots()
    }

    pub fn refinement_queue(&self) -> &RefinementQueue {
        &self.queue
    }

    pub fn implied_log(&self) -> &ImpliedBattleLog {
        &self.implied_log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn id(n: u32) -> CandidateId {
        CandidateId(n)
    }

    fn engine(n: u32) -> RankingEngine {
        let pool = CandidatePool::new((1..=n).map(|i| Candidate::new(i, format!("mon-{i}"))).collect())
            .unwrap();
        let config = EngineConfig {
            rng_seed: Some(7),
            milestones: vec![3],
            milestone_interval: 0,
            ..EngineConfig::default()
        };
        RankingEngine::new(config, pool)
    }

    #[test]
    fn test_pair_battle_updates_both_sides() {
        let mut engine = engine(5);
        let report = engine
            .submit_battle_result(BattleType::Pairs, &[id(1), id(2)], &[id(2)])
            .unwrap();
        assert_eq!(report.battle_number, 1);
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.milestone, None);

        let rankings = engine.get_rankings();
        assert_eq!(rankings.len(), 2);
        assert_eq!(rankings[0].id, id(2));
        assert_eq!(rankings[0].stats.wins, 1);
        assert_eq!(rankings[1].stats.losses, 1);
    }

    #[test]
    fn test_triplet_battle_applies_every_pair() {
        let mut engine = engine(5);
        let report = engine
            .submit_battle_result(BattleType::Triplets, &[id(1), id(2), id(3)], &[id(3)])
            .unwrap();
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(engine.store().stats(id(3)).wins, 2);
        assert_eq!(engine.total_battles(), 1);
    }

    #[test]
    fn test_unknown_candidate_rejected_without_change() {
        let mut engine = engine(3);
        let err = engine
            .submit_battle_result(BattleType::Pairs, &[id(1), id(42)], &[id(1)])
            .unwrap_err();
        assert_eq!(err, EngineError::Battle(BattleError::UnknownCandidate(id(42))));
        assert_eq!(engine.total_battles(), 0);
        assert!(engine.store().is_empty());
    }

    #[test]
    fn test_milestone_blocks_until_continued() {
        let mut engine = engine(5);
        for _ in 0..2 {
            engine
                .submit_battle_result(BattleType::Pairs, &[id(1), id(2)], &[id(1)])
                .unwrap();
        }
        let report = engine
            .submit_battle_result(BattleType::Pairs, &[id(3), id(4)], &[id(3)])
            .unwrap();
        assert_eq!(report.milestone, Some(3));
        assert!(engine.get_milestone_snapshot(3).is_some());

        let err = engine
            .submit_battle_result(BattleType::Pairs, &[id(1), id(2)], &[id(1)])
            .unwrap_err();
        assert_eq!(err, EngineError::MilestoneReviewPending { battle_count: 3 });

        engine.continue_from_milestone().unwrap();
        assert_eq!(engine.state(), ProgressionState::Battling);
        assert_eq!(
            engine.continue_from_milestone(),
            Err(EngineError::NotInMilestoneReview)
        );
    }

    #[test]
    fn test_reorder_allowed_during_review() {
        let mut engine = engine(5);
        for _ in 0..3 {
            engine
                .submit_battle_result(BattleType::Pairs, &[id(1), id(2)], &[id(1)])
                .unwrap();
        }
        assert!(matches!(engine.state(), ProgressionState::MilestoneReview { .. }));
        engine
            .submit_manual_reorder(id(2), 0, &[id(1), id(2)])
            .unwrap();
        assert_eq!(engine.total_battles(), 3);
    }

    #[test]
    fn test_invalid_reorder_leaves_state_unchanged() {
        let mut engine = engine(5);
        engine
            .submit_battle_result(BattleType::Pairs, &[id(1), id(2)], &[id(1)])
            .unwrap();
        let before = engine.get_rankings();
        let err = engine
            .submit_manual_reorder(id(1), 5, &[id(1), id(2)])
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::Reorder(ReorderError::IndexOutOfRange { index: 5, len: 2 })
        );
        assert_eq!(engine.get_rankings(), before);
        assert!(engine.implied_log().is_empty());
    }

    #[test]
    fn test_reorder_records_audit_labels() {
        let mut engine = engine(5);
        engine
            .submit_manual_reorder(id(3), 0, &[id(1), id(2), id(3)])
            .unwrap();
        let labels: Vec<String> = engine.store().history().iter().map(|o| o.label.clone()).collect();
        assert_eq!(labels, vec!["below1#1", "below1#2", "below2#3"]);
        assert_eq!(engine.implied_log().len(), 3);
    }

    #[test]
    fn test_undo_restores_previous_ratings() {
        let mut engine = engine(5);
        engine
            .submit_battle_result(BattleType::Pairs, &[id(1), id(2)], &[id(1)])
            .unwrap();
        let before = engine.get_rankings();
        engine
            .submit_battle_result(BattleType::Pairs, &[id(2), id(3)], &[id(3)])
            .unwrap();

        assert_eq!(engine.undo_last_battle(), Ok(2));
        assert_eq!(engine.get_rankings(), before);
        assert_eq!(engine.total_battles(), 1);
    }

    #[test]
    fn test_undo_milestone_battle_drops_snapshot() {
        let mut engine = engine(5);
        for _ in 0..3 {
            engine
                .submit_battle_result(BattleType::Pairs, &[id(1), id(2)], &[id(1)])
                .unwrap();
        }
        assert!(engine.get_milestone_snapshot(3).is_some());
        engine.undo_last_battle().unwrap();
        assert!(engine.get_milestone_snapshot(3).is_none());
        assert_eq!(engine.state(), ProgressionState::Battling);
    }

    #[test]
    fn test_undo_with_nothing_recorded() {
        let mut engine = engine(3);
        assert_eq!(engine.undo_last_battle(), Err(EngineError::NothingToUndo));
    }

    #[test]
    fn test_refinement_flag_and_unflag() {
        let mut engine = engine(8);
        assert!(engine.enqueue_refinement(id(4)));
        assert!(!engine.enqueue_refinement(id(4)));
        assert_eq!(engine.refinement_queue().len(), 1);

        let battle = engine.next_battle().unwrap();
        assert_eq!(battle[0].id, id(4));

        assert!(engine.remove_refinement(id(4)));
        assert!(!engine.remove_refinement(id(4)));
        assert!(engine.refinement_queue().is_empty());
    }

    #[test]
    fn test_category_filter_limits_selection() {
        let pool = CandidatePool::new(
            (1..=10)
                .map(|i| Candidate::new(i, format!("mon-{i}")).with_category(i % 2))
                .collect(),
        )
        .unwrap();
        let mut engine = RankingEngine::new(
            EngineConfig {
                rng_seed: Some(3),
                ..EngineConfig::default()
            },
            pool,
        );
        engine.set_category_filter(Some(1));
        for _ in 0..20 {
            let battle = engine.next_battle().unwrap();
            assert!(battle.iter().all(|c| c.category == Some(1)));
        }
    }

    #[test]
    fn test_refinement_rejects_unknown_candidate() {
        let mut engine = engine(4);
        assert!(!engine.enqueue_refinement(id(42)));
        assert!(engine.refinement_queue().is_empty());
    }

    #[test]
    fn test_category_filter_keeps_flags_outside_it() {
        let pool = CandidatePool::new(
            (1..=10)
                .map(|i| Candidate::new(i, format!("mon-{i}")).with_category(i % 2))
                .collect(),
        )
        .unwrap();
        let mut engine = RankingEngine::new(
            EngineConfig {
                rng_seed: Some(5),
                ..EngineConfig::default()
            },
            pool,
        );
        assert!(engine.enqueue_refinement(id(2)));

        engine.set_category_filter(Some(1));
        let battle = engine.next_battle().unwrap();
        assert!(battle.iter().all(|c| c.category == Some(1)));
        assert!(engine.refinement_queue().contains(id(2)));

        engine.set_category_filter(None);
        let battle = engine.next_battle().unwrap();
        assert_eq!(battle[0].id, id(2));
    }

    #[test]
    fn test_observers_receive_events_in_order() {
        let mut engine = engine(5);
        let seen: Rc<RefCell<Vec<EngineEvent>>> = Rc::default();
        let sink = Rc::clone(&seen);
        engine.subscribe(move |event: &EngineEvent| sink.borrow_mut().push(event.clone()));

        for _ in 0..3 {
            engine
                .submit_battle_result(BattleType::Pairs, &[id(1), id(2)], &[id(1)])
                .unwrap();
        }
        engine.continue_from_milestone().unwrap();
        engine.reset();

        let events = seen.borrow();
        assert!(matches!(events[0], EngineEvent::BattleRecorded { battle_number: 1, .. }));
        assert_eq!(events[3], EngineEvent::MilestoneReached { battle_count: 3 });
        assert_eq!(events[4], EngineEvent::MilestoneContinued { battle_count: 3 });
        assert_eq!(events.last(), Some(&EngineEvent::Reset));
    }

    #[test]
    fn test_persisted_round_trip() {
        let mut engine = engine(6);
        for (a, b) in [(1, 2), (3, 4), (5, 6)] {
            engine
                .submit_battle_result(BattleType::Pairs, &[id(a), id(b)], &[id(b)])
                .unwrap();
        }
        engine.enqueue_refinement(id(1));
        let state = engine.to_persisted();
        assert!(state.review_pending);

        let restored = RankingEngine::from_persisted(
            engine.config().clone(),
            engine.pool().clone(),
            state.clone(),
        );
        assert_eq!(restored.get_rankings(), engine.get_rankings());
        assert_eq!(restored.state(), ProgressionState::MilestoneReview { battle_count: 3 });
        assert_eq!(restored.to_persisted(), state);
    }
}
