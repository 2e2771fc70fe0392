//! The rating store: sole owner and writer of rating state.

use crate::candidate::CandidateId;
use crate::outcome::BattleOutcome;
use crate::rating::{BattleStat, Rating};
use crate::trueskill::{self, RatingParams};
use std::collections::BTreeMap;

/// Ratings, battle counters and the outcome history.
///
/// Every rating change goes through [`RatingStore::apply`], which runs the
/// update rule and writes both sides back within one call.
#[derive(Debug, Clone, Default)]
pub struct RatingStore {
    params: RatingParams,
    ratings: BTreeMap<CandidateId, Rating>,
    stats: BTreeMap<CandidateId, BattleStat>,
    history: Vec<BattleOutcome>,
}

impl RatingStore {
    /// Creates an empty store using the given model constants.
    pub fn new(params: RatingParams) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    /// Returns the model constants.
    pub fn params(&self) -> &RatingParams {
        &self.params
    }

    /// Returns the candidate's rating, creating the prior on first reference.
    pub fn get_or_init(&mut self, id: CandidateId) -> Rating {
        *self.ratings.entry(id).or_insert_with(|| self.params.prior())
    }

    /// Returns the candidate's rating if it has one.
    pub fn rating(&self, id: CandidateId) -> Option<Rating> {
        self.ratings.get(&id).copied()
    }

    /// Returns the candidate's battle counters (zero if unranked).
    pub fn stats(&self, id: CandidateId) -> BattleStat {
        self.stats.get(&id).copied().unwrap_or_default()
    }

    /// Returns true if the candidate has a rating.
    pub fn is_ranked(&self, id: CandidateId) -> bool {
        self.ratings.contains_key(&id)
    }

    /// Number of ranked candidates.
    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    /// Returns true if no candidate is ranked.
    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    /// All applied outcomes, oldest first.
    pub fn history(&self) -> &[BattleOutcome] {
        &self.history
    }

    /// Iterates ranked candidates in id order.
    pub fn iter(&self) -> impl Iterator<Item = (CandidateId, Rating, BattleStat)> + '_ {
        self.ratings
            .iter()
            .map(|(&id, &rating)| (id, rating, self.stats(id)))
    }

    /// Applies one outcome and records it in the history.
    ///
    /// An outcome whose winner and loser coincide carries no information
    /// and is dropped.
    pub fn apply(&mut self, outcome: BattleOutcome) {
        if outcome.winner == outcome.loser {
            tracing::warn!(
                "Ignoring outcome {} with identical winner and loser {}",
                outcome.label,
                outcome.winner
            );
            return;
        }

        let winner = self.get_or_init(outcome.winner);
        let loser = self.get_or_init(outcome.loser);
        let (winner, loser) = trueskill::update(winner, loser, &self.params);

        self.ratings.insert(outcome.winner, winner);
        self.ratings.insert(outcome.loser, loser);
        self.stats.entry(outcome.winner).or_default().record_win();
        self.stats.entry(outcome.loser).or_default().record_loss();

        tracing::debug!(
            "{} beat {} ({}): {:.2} / {:.2}",
            outcome.winner,
            outcome.loser,
            outcome.label,
            winner.conservative_score(),
            loser.conservative_score()
        );
        self.history.push(outcome);
    }

    /// Clears everything and replays `outcomes` in order.
    pub fn rebuild(&mut self, outcomes: Vec<BattleOutcome>) {
        self.clear();
        for outcome in outcomes {
            self.apply(outcome);
        }
    }

    /// Removes all ratings, counters and history.
    pub fn clear(&mut self) {
        self.ratings.clear();
        self.stats.clear();
        self.history.clear();
    }

    /// Reinstates a persisted rating without running the update rule.
    pub(crate) fn restore(&mut self, id: CandidateId, rating: Rating, stat: BattleStat) {
        self.ratings.insert(id, rating);
        self.stats.insert(id, stat);
    }

    pub(crate) fn restore_history(&mut self, history: Vec<BattleOutcome>) {
        self.history = history;
    }
}
